//! Resource routes: `/{table}` and `/{table}/:id` for each of the four kinds.

use crate::handlers::entity::{create, delete as delete_handler, list, read, update};
use crate::model::{Article, Category, Comment, Resource, User};
use crate::state::AppState;
use axum::{routing::get, Router};

fn resource_routes<R: Resource>() -> Router<AppState> {
    let base = format!("/{}", R::KIND.table());
    Router::new()
        .route(&base, get(list::<R>).post(create::<R>))
        .route(
            &format!("{}/:id", base),
            get(read::<R>).put(update::<R>).delete(delete_handler::<R>),
        )
}

pub fn entity_routes(state: AppState) -> Router {
    Router::new()
        .merge(resource_routes::<User>())
        .merge(resource_routes::<Category>())
        .merge(resource_routes::<Article>())
        .merge(resource_routes::<Comment>())
        .with_state(state)
}
