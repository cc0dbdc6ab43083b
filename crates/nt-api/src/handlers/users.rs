//! User API handlers

use std::sync::Arc;

use nt_db::Collection;

use crate::error::{ApiError, ApiResult};
use crate::factory::Resource;

pub fn resource(users: Arc<dyn Collection>) -> Resource {
    Resource::new("user", "users", users)
}

/// POST /api/v1/users
///
/// Accounts are created by signing up.
pub async fn create_user() -> ApiResult<()> {
    Err(ApiError::NotDefined(
        "This route is not defined! Please use /signup instead".to_string(),
    ))
}
