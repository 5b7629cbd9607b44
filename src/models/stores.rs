use serde::{Deserialize, Serialize};

use super::{nullable, row_id};

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Store {
    #[serde(with = "row_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub logo_url: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Product {
    #[serde(with = "row_id")]
    pub id: String,
    #[serde(with = "row_id")]
    pub store_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "nullable::deserialize")]
    pub images: Vec<String>,
    #[serde(default, deserialize_with = "nullable::deserialize")]
    pub features: Vec<String>,
    #[serde(default, deserialize_with = "nullable::deserialize")]
    pub specifications: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub original_price_inr: Option<f64>,
    #[serde(default)]
    pub discounted_price_inr: Option<f64>,
    pub cost_in_points: i64,
    #[serde(default)]
    pub instructions: Option<String>,
}

impl Product {
    pub fn cover_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }
}
