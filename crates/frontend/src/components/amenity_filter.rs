use std::collections::BTreeSet;

use dioxus::prelude::*;
use estatemap_shared::models::AmenityCategory;

/// Toggle `category` in a filter set, returning the new set.
pub fn toggled(
    filters: &BTreeSet<AmenityCategory>,
    category: AmenityCategory,
) -> BTreeSet<AmenityCategory> {
    let mut next = filters.clone();
    if !next.remove(&category) {
        next.insert(category);
    }
    next
}

#[component]
pub fn AmenityFilter(
    filters: BTreeSet<AmenityCategory>,
    counts: Vec<(AmenityCategory, usize)>,
    on_change: EventHandler<BTreeSet<AmenityCategory>>,
) -> Element {
    rsx! {
        div { class: "panel",
            h3 { "Nearby Amenities" }
            div { class: "amenity-filter",
                for (category, count) in counts {
                    label {
                        class: "amenity-toggle amenity-{category}",
                        input {
                            r#type: "checkbox",
                            checked: filters.contains(&category),
                            onchange: {
                                let filters = filters.clone();
                                move |_| on_change.call(toggled(&filters, category))
                            },
                        }
                        span { {category.label()} }
                        span { class: "amenity-count", "{count}" }
                    }
                }
            }
            if !filters.is_empty() {
                button {
                    class: "secondary",
                    onclick: move |_| on_change.call(BTreeSet::new()),
                    "Clear filters"
                }
            }
        }
    }
}
