use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use logging_starter::{
    HandlerError, InterceptorChain, Invocation, Loggable, LoggingStarter, Marker,
};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Item {
    id: u32,
    name: String,
}

impl Loggable for Item {}

#[derive(Debug, thiserror::Error)]
enum StoreError {
    #[error("item {0} already exists")]
    Duplicate(u32),
}

/// In-memory item store whose operations are logged through marker chains.
struct ItemStore {
    items: Mutex<BTreeMap<u32, Item>>,
    create: InterceptorChain<Item>,
    find: InterceptorChain<Option<Item>>,
    purge: InterceptorChain<u64>,
}

impl ItemStore {
    fn new() -> Self {
        Self {
            items: Mutex::new(BTreeMap::new()),
            create: InterceptorChain::new()
                .mark(Marker::Post)
                .mark(Marker::ExceptionLogging),
            find: InterceptorChain::new().mark(Marker::Get),
            purge: InterceptorChain::new().mark(Marker::ModifyingOperation),
        }
    }

    async fn create(&self, item: Item) -> Result<Item, HandlerError> {
        let invocation = Invocation::new::<ItemStore>("create").body(item.clone());
        self.create
            .invoke(&invocation, || async move {
                let mut items = self.items.lock().unwrap();
                if items.contains_key(&item.id) {
                    return Err(HandlerError::new(StoreError::Duplicate(item.id)));
                }
                items.insert(item.id, item.clone());
                Ok(item)
            })
            .await
    }

    async fn find(&self, id: u32) -> Result<Option<Item>, HandlerError> {
        let invocation = Invocation::new::<ItemStore>("find").arg(id);
        self.find
            .invoke(&invocation, || async move {
                Ok(self.items.lock().unwrap().get(&id).cloned())
            })
            .await
    }

    async fn purge(&self) -> Result<u64, HandlerError> {
        let invocation = Invocation::new::<ItemStore>("purge");
        self.purge
            .invoke(&invocation, || async move {
                let mut items = self.items.lock().unwrap();
                let removed = items.len() as u64;
                items.clear();
                Ok(removed)
            })
            .await
    }
}

async fn create_item(
    State(store): State<Arc<ItemStore>>,
    Json(item): Json<Item>,
) -> impl IntoResponse {
    match store.create(item).await {
        Ok(item) => (StatusCode::CREATED, Json(item)).into_response(),
        Err(e) => (StatusCode::CONFLICT, e.to_string()).into_response(),
    }
}

async fn get_item(State(store): State<Arc<ItemStore>>, Path(id): Path<u32>) -> impl IntoResponse {
    match store.find(id).await {
        Ok(Some(item)) => Json(item).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

async fn purge_items(State(store): State<Arc<ItemStore>>) -> impl IntoResponse {
    match store.purge().await {
        Ok(removed) => Json(serde_json::json!({ "removed": removed })).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let Some(starter) = LoggingStarter::from_env()? else {
        anyhow::bail!("set LOGGING_STARTER_ENABLED=true to run the demo");
    };

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::from(starter.config().level))
        .init();

    info!(level = %starter.config().level, "Starting logging-starter demo server");

    let store = Arc::new(ItemStore::new());

    let app = Router::new()
        .route("/items", post(create_item).delete(purge_items))
        .route("/items/{id}", get(get_item))
        .route_layer(starter.http_layer())
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(store);

    info!("Try these commands:");
    info!(r#"  curl -X POST -H 'content-type: application/json' -d '{{"id":1,"name":"x"}}' http://localhost:3000/items"#);
    info!("  curl http://localhost:3000/items/1");
    info!("  curl -X DELETE http://localhost:3000/items");

    let listener = TcpListener::bind("0.0.0.0:3000").await?;
    info!("Demo server listening on http://localhost:3000");

    axum::serve(listener, app).await?;

    Ok(())
}
