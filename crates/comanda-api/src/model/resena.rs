use bson::{Document, doc};
use serde::Deserialize;

use super::fields;
use super::{Entity, Reference, Schema, ValidationError};

pub struct Resena;

impl Entity for Resena {
    const COLLECTION: &'static str = "Resena";
    const LABEL: &'static str = "Reseña";
    const PLURAL: &'static str = "reseñas";
    const BULK_DELETED: &'static str = "Reseñas eliminadas exitosamente";
    const POPULATE: &'static [Reference] = &[
        Reference {
            path: "usuario_id",
            collection: "Usuario",
        },
        Reference {
            path: "restaurante_id",
            collection: "Restaurante",
        },
        Reference {
            path: "orden_id",
            collection: "Orden",
        },
    ];
    const ID_FIELDS: &'static [&'static str] = &["_id", "usuario_id", "restaurante_id", "orden_id"];

    type New = NewResena;
    type Patch = ResenaPatch;
}

fn calificacion(value: f64) -> Result<f64, ValidationError> {
    fields::between("calificacion", value, 0.0, 5.0)
}

#[derive(Debug, Deserialize)]
pub struct NewResena {
    pub usuario_id: String,
    pub restaurante_id: String,
    pub orden_id: String,
    pub calificacion: f64,
    pub comentario: Option<String>,
    pub fecha: Option<String>,
}

impl Schema for NewResena {
    fn into_document(self) -> Result<Document, ValidationError> {
        let mut doc = doc! {
            "usuario_id": fields::object_id("usuario_id", &self.usuario_id)?,
            "restaurante_id": fields::object_id("restaurante_id", &self.restaurante_id)?,
            "orden_id": fields::object_id("orden_id", &self.orden_id)?,
            "calificacion": calificacion(self.calificacion)?,
        };
        if let Some(comentario) = self.comentario {
            doc.insert("comentario", comentario.trim());
        }
        doc.insert("fecha", fields::date_or_now("fecha", self.fecha.as_deref())?);
        Ok(doc)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ResenaPatch {
    pub usuario_id: Option<String>,
    pub restaurante_id: Option<String>,
    pub orden_id: Option<String>,
    pub calificacion: Option<f64>,
    pub comentario: Option<String>,
    pub fecha: Option<String>,
}

impl Schema for ResenaPatch {
    fn into_document(self) -> Result<Document, ValidationError> {
        let mut patch = Document::new();
        for (field, value) in [
            ("usuario_id", self.usuario_id),
            ("restaurante_id", self.restaurante_id),
            ("orden_id", self.orden_id),
        ] {
            if let Some(v) = value {
                patch.insert(field, fields::object_id(field, &v)?);
            }
        }
        if let Some(v) = self.calificacion {
            patch.insert("calificacion", calificacion(v)?);
        }
        if let Some(v) = self.comentario {
            patch.insert("comentario", v.trim());
        }
        if let Some(v) = self.fecha {
            patch.insert("fecha", fields::date("fecha", &v)?);
        }
        Ok(patch)
    }
}
