use bson::{Bson, Document, doc};
use comanda_store::{DocumentStore, StoreError};
use serde::Deserialize;

use super::fields;
use super::{Entity, Reference, Schema, ValidationError};

pub struct ArticuloMenu;

impl Entity for ArticuloMenu {
    const COLLECTION: &'static str = "ArticuloMenu";
    const LABEL: &'static str = "Articulo";
    const PLURAL: &'static str = "articulos";
    const BULK_DELETED: &'static str = "Articulos eliminados exitosamente";
    const POPULATE: &'static [Reference] = &[Reference {
        path: "restaurante_id",
        collection: "Restaurante",
    }];
    const ID_FIELDS: &'static [&'static str] = &["_id", "restaurante_id"];

    type New = NewArticulo;
    type Patch = ArticuloPatch;

    /// The restaurant's `menu` lists its items.
    fn after_create(store: &dyn DocumentStore, doc: &Document) -> Result<(), StoreError> {
        let (Some(id), Ok(restaurante_id)) = (doc.get("_id"), doc.get_object_id("restaurante_id"))
        else {
            return Ok(());
        };
        store.update_one(
            "Restaurante",
            &doc! { "_id": restaurante_id },
            &doc! { "$push": { "menu": id.clone() } },
        )?;
        Ok(())
    }

    fn after_delete(store: &dyn DocumentStore, doc: &Document) -> Result<(), StoreError> {
        let (Some(id), Ok(restaurante_id)) = (doc.get("_id"), doc.get_object_id("restaurante_id"))
        else {
            return Ok(());
        };
        store.update_one(
            "Restaurante",
            &doc! { "_id": restaurante_id },
            &doc! { "$pull": { "menu": id.clone() } },
        )?;
        Ok(())
    }
}

fn precio(value: f64) -> Result<f64, ValidationError> {
    fields::at_least("precio", value, 0.0)
}

#[derive(Debug, Deserialize)]
pub struct NewArticulo {
    pub nombre: String,
    pub descripcion: String,
    pub precio: f64,
    pub restaurante_id: String,
    #[serde(default = "available")]
    pub disponible: bool,
}

fn available() -> bool {
    true
}

impl Schema for NewArticulo {
    fn into_document(self) -> Result<Document, ValidationError> {
        Ok(doc! {
            "nombre": fields::text("nombre", self.nombre)?,
            "descripcion": fields::text("descripcion", self.descripcion)?,
            "precio": precio(self.precio)?,
            "restaurante_id": fields::object_id("restaurante_id", &self.restaurante_id)?,
            "disponible": self.disponible,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ArticuloPatch {
    pub nombre: Option<String>,
    pub descripcion: Option<String>,
    pub precio: Option<f64>,
    pub restaurante_id: Option<String>,
    pub disponible: Option<bool>,
}

impl Schema for ArticuloPatch {
    fn into_document(self) -> Result<Document, ValidationError> {
        let mut patch = Document::new();
        if let Some(v) = self.nombre {
            patch.insert("nombre", fields::text("nombre", v)?);
        }
        if let Some(v) = self.descripcion {
            patch.insert("descripcion", fields::text("descripcion", v)?);
        }
        if let Some(v) = self.precio {
            patch.insert("precio", precio(v)?);
        }
        if let Some(v) = self.restaurante_id {
            patch.insert(
                "restaurante_id",
                Bson::ObjectId(fields::object_id("restaurante_id", &v)?),
            );
        }
        if let Some(v) = self.disponible {
            patch.insert("disponible", v);
        }
        Ok(patch)
    }
}
