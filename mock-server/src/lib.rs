use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::info;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct City {
    pub id: u64,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// Cities in insertion order plus the next id to hand out.
#[derive(Debug, Default)]
pub struct Table {
    cities: Vec<City>,
    next_id: u64,
}

impl Table {
    pub fn new(seed: Vec<City>) -> Self {
        let next_id = seed.iter().map(|c| c.id).max().map_or(1, |max| max + 1);
        Self {
            cities: seed,
            next_id,
        }
    }
}

pub type Db = Arc<RwLock<Table>>;

pub fn app() -> Router {
    app_with(Vec::new())
}

pub fn app_with(seed: Vec<City>) -> Router {
    let db: Db = Arc::new(RwLock::new(Table::new(seed)));
    Router::new()
        .route("/cities", get(list_cities).post(create_city))
        .route("/cities/{id}", get(get_city).delete(delete_city))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    serve(listener, Vec::new()).await
}

pub async fn serve(listener: TcpListener, seed: Vec<City>) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with(seed)).await
}

/// Read a seed file: either a JSON array of cities or a json-server style
/// document `{"cities": [...]}`.
pub fn load_seed(raw: &str) -> Result<Vec<City>, serde_json::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Seed {
        List(Vec<City>),
        Document { cities: Vec<City> },
    }

    Ok(match serde_json::from_str(raw)? {
        Seed::List(cities) | Seed::Document { cities } => cities,
    })
}

async fn list_cities(State(db): State<Db>) -> Json<Vec<City>> {
    Json(db.read().await.cities.clone())
}

async fn create_city(
    State(db): State<Db>,
    Json(mut fields): Json<Map<String, Value>>,
) -> (StatusCode, Json<City>) {
    fields.remove("id");
    let mut table = db.write().await;
    let city = City {
        id: table.next_id,
        fields,
    };
    table.next_id += 1;
    table.cities.push(city.clone());
    info!(id = city.id, "created city");
    (StatusCode::CREATED, Json(city))
}

async fn get_city(State(db): State<Db>, Path(id): Path<u64>) -> Result<Json<City>, StatusCode> {
    let table = db.read().await;
    table
        .cities
        .iter()
        .find(|c| c.id == id)
        .cloned()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn delete_city(State(db): State<Db>, Path(id): Path<u64>) -> StatusCode {
    let mut table = db.write().await;
    let before = table.cities.len();
    table.cities.retain(|c| c.id != id);
    if table.cities.len() == before {
        return StatusCode::NOT_FOUND;
    }
    info!(id, "deleted city");
    StatusCode::NO_CONTENT
}
