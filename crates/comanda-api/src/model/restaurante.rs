use bson::{Document, doc};
use serde::Deserialize;

use super::fields::{self, Ubicacion};
use super::{Entity, Schema, ValidationError};

pub struct Restaurante;

impl Entity for Restaurante {
    const COLLECTION: &'static str = "Restaurante";
    const LABEL: &'static str = "Restaurante";
    const PLURAL: &'static str = "restaurantes";
    const BULK_DELETED: &'static str = "Restaurantes eliminados exitosamente";
    const ID_FIELDS: &'static [&'static str] = &["_id", "menu"];

    type New = NewRestaurante;
    type Patch = RestaurantePatch;
}

fn calificacion(value: f64) -> Result<f64, ValidationError> {
    fields::between("calificacion_promedio", value, 0.0, 5.0)
}

#[derive(Debug, Deserialize)]
pub struct NewRestaurante {
    pub nombre: String,
    pub direccion: String,
    pub ubicacion: Option<Ubicacion>,
    #[serde(default)]
    pub calificacion_promedio: f64,
    #[serde(default)]
    pub categorias: Vec<String>,
    #[serde(default)]
    pub menu: Vec<String>,
}

impl Schema for NewRestaurante {
    fn into_document(self) -> Result<Document, ValidationError> {
        let mut doc = doc! {
            "nombre": fields::text("nombre", self.nombre)?,
            "direccion": fields::text("direccion", self.direccion)?,
        };
        if let Some(ubicacion) = self.ubicacion {
            doc.insert("ubicacion", ubicacion.to_document());
        }
        doc.insert(
            "calificacion_promedio",
            calificacion(self.calificacion_promedio)?,
        );
        doc.insert("categorias", fields::strings(self.categorias));
        doc.insert("menu", fields::object_ids("menu", &self.menu)?);
        Ok(doc)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RestaurantePatch {
    pub nombre: Option<String>,
    pub direccion: Option<String>,
    pub ubicacion: Option<Ubicacion>,
    pub calificacion_promedio: Option<f64>,
    pub categorias: Option<Vec<String>>,
    pub menu: Option<Vec<String>>,
}

impl Schema for RestaurantePatch {
    fn into_document(self) -> Result<Document, ValidationError> {
        let mut patch = Document::new();
        if let Some(v) = self.nombre {
            patch.insert("nombre", fields::text("nombre", v)?);
        }
        if let Some(v) = self.direccion {
            patch.insert("direccion", fields::text("direccion", v)?);
        }
        if let Some(v) = self.ubicacion {
            patch.insert("ubicacion", v.to_document());
        }
        if let Some(v) = self.calificacion_promedio {
            patch.insert("calificacion_promedio", calificacion(v)?);
        }
        if let Some(v) = self.categorias {
            patch.insert("categorias", fields::strings(v));
        }
        if let Some(v) = self.menu {
            patch.insert("menu", fields::object_ids("menu", &v)?);
        }
        Ok(patch)
    }
}
