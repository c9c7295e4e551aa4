mod resource;

pub use resource::resource_routes;
