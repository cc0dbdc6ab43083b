//! Review API handlers

use std::sync::Arc;

use nt_db::Collection;
use nt_models::review::TOUR_FIELD;

use crate::factory::Resource;

/// All reviews
pub fn resource(reviews: Arc<dyn Collection>) -> Resource {
    Resource::new("review", "reviews", reviews)
}

/// Reviews of the tour named by the `id` path parameter
pub fn nested_resource(reviews: Arc<dyn Collection>) -> Resource {
    resource(reviews).nested_under("id", TOUR_FIELD)
}
