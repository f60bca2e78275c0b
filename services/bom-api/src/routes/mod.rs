use axum::{
    routing::{get, post, put},
    Router,
};

use crate::{handlers::*, AppState};

pub fn create_api_routes() -> Router<AppState> {
    Router::new()
        .route("/health/detailed", get(detailed_health_check))
        .route("/parts/:id", get(get_part))
        .route("/parts/:id/bom", get(get_part_bom).post(create_part_bom))
        .route("/parts/:id/where-used", get(where_used))
        .route("/parts/:id/ancestors", get(ancestors))
        .route("/parts/:id/descendants", get(descendants))
        .route("/parts/:id/explosion", get(explosion))
        .route("/parts/:id/components", post(add_component))
        .route("/boms/:id", get(get_bom).put(save_bom).delete(delete_bom))
        .route("/boms/:id/items", post(add_bom_item).delete(clear_bom_items))
        .route("/items/:id", put(update_item).delete(delete_item))
        .route("/cycle-check", get(cycle_check))
}
