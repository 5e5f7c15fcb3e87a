//! The five collections, their request schemas and the hooks that keep
//! cross-collection references in step.

mod articulo;
mod fields;
mod orden;
mod resena;
mod restaurante;
mod usuario;

use std::fmt;

use bson::Document;
use comanda_store::{CollectionConfig, DocumentStore, StoreError};
use serde::de::DeserializeOwned;
use serde_json::Value;

pub use articulo::{ArticuloMenu, ArticuloPatch, NewArticulo};
pub use fields::Ubicacion;
pub use orden::{Estado, LineaOrden, NewOrden, Orden, OrdenPatch};
pub use resena::{NewResena, Resena, ResenaPatch};
pub use restaurante::{NewRestaurante, Restaurante, RestaurantePatch};
pub use usuario::{NewUsuario, Usuario, UsuarioPatch};

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// The body did not deserialize into the schema.
    Body(String),
    Required(&'static str),
    Range {
        field: &'static str,
        min: f64,
        max: Option<f64>,
    },
    Invalid {
        field: &'static str,
        message: String,
    },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::Body(msg) => write!(f, "validation failed: {msg}"),
            ValidationError::Required(field) => write!(f, "validation failed: {field} is required"),
            ValidationError::Range {
                field,
                min,
                max: Some(max),
            } => write!(f, "validation failed: {field} must be between {min} and {max}"),
            ValidationError::Range {
                field,
                min,
                max: None,
            } => write!(f, "validation failed: {field} must be at least {min}"),
            ValidationError::Invalid { field, message } => {
                write!(f, "validation failed: {field}: {message}")
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// A request body shape that validates into a store document.
pub trait Schema: DeserializeOwned {
    fn into_document(self) -> Result<Document, ValidationError>;
}

/// Deserialize and validate a JSON body.
pub fn validate<S: Schema>(body: Value) -> Result<Document, ValidationError> {
    serde_json::from_value::<S>(body)
        .map_err(|e| ValidationError::Body(e.to_string()))?
        .into_document()
}

/// A field holding the `_id` of a document in another collection.
#[derive(Debug, Clone, Copy)]
pub struct Reference {
    /// Dotted path; array segments are walked.
    pub path: &'static str,
    pub collection: &'static str,
}

/// A collection served by the generic repository and CRUD routes.
pub trait Entity: Send + Sync + 'static {
    const COLLECTION: &'static str;
    /// Singular name used in response messages.
    const LABEL: &'static str;
    /// Lowercase plural for the bulk-create error.
    const PLURAL: &'static str;
    /// Message returned by bulk delete.
    const BULK_DELETED: &'static str;
    const UNIQUE: &'static [&'static str] = &[];
    /// References replaced by the referenced document on every read.
    const POPULATE: &'static [Reference] = &[];
    /// Top-level fields stored as `ObjectId`; hex strings in bulk filters are
    /// cast for these.
    const ID_FIELDS: &'static [&'static str] = &[];

    type New: Schema;
    type Patch: Schema;

    fn after_create(_store: &dyn DocumentStore, _doc: &Document) -> Result<(), StoreError> {
        Ok(())
    }

    fn after_delete(_store: &dyn DocumentStore, _doc: &Document) -> Result<(), StoreError> {
        Ok(())
    }

    fn collection_config() -> CollectionConfig {
        Self::UNIQUE
            .iter()
            .fold(CollectionConfig::new(Self::COLLECTION), |config, field| {
                config.unique(*field)
            })
    }
}

/// Create every collection with its unique indexes.
pub fn ensure_collections(store: &dyn DocumentStore) -> Result<(), StoreError> {
    store.create_collection(&Usuario::collection_config())?;
    store.create_collection(&Restaurante::collection_config())?;
    store.create_collection(&ArticuloMenu::collection_config())?;
    store.create_collection(&Orden::collection_config())?;
    store.create_collection(&Resena::collection_config())?;
    Ok(())
}
