pub mod amenity_filter;
pub mod map_view;
pub mod project_details;
