use bson::{Document, doc};
use serde::Deserialize;

use super::fields::{self, Ubicacion};
use super::{Entity, Schema, ValidationError};

pub struct Usuario;

impl Entity for Usuario {
    const COLLECTION: &'static str = "Usuario";
    const LABEL: &'static str = "Usuario";
    const PLURAL: &'static str = "usuarios";
    const BULK_DELETED: &'static str = "Usuarios eliminados exitosamente";
    const UNIQUE: &'static [&'static str] = &["correo"];
    const ID_FIELDS: &'static [&'static str] = &["_id"];

    type New = NewUsuario;
    type Patch = UsuarioPatch;
}

fn correo(value: String) -> Result<String, ValidationError> {
    Ok(fields::text("correo", value)?.to_lowercase())
}

#[derive(Debug, Deserialize)]
pub struct NewUsuario {
    pub nombre: String,
    pub apellido: String,
    pub correo: String,
    pub direccion: String,
    pub ubicacion: Ubicacion,
    pub fecha_registro: Option<String>,
    #[serde(default)]
    pub favoritos: Vec<String>,
}

impl Schema for NewUsuario {
    fn into_document(self) -> Result<Document, ValidationError> {
        Ok(doc! {
            "nombre": fields::text("nombre", self.nombre)?,
            "apellido": fields::text("apellido", self.apellido)?,
            "correo": correo(self.correo)?,
            "direccion": fields::text("direccion", self.direccion)?,
            "ubicacion": self.ubicacion.to_document(),
            "fecha_registro": fields::date_or_now("fecha_registro", self.fecha_registro.as_deref())?,
            "favoritos": self.favoritos,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UsuarioPatch {
    pub nombre: Option<String>,
    pub apellido: Option<String>,
    pub correo: Option<String>,
    pub direccion: Option<String>,
    pub ubicacion: Option<Ubicacion>,
    pub fecha_registro: Option<String>,
    pub favoritos: Option<Vec<String>>,
}

impl Schema for UsuarioPatch {
    fn into_document(self) -> Result<Document, ValidationError> {
        let mut patch = Document::new();
        if let Some(v) = self.nombre {
            patch.insert("nombre", fields::text("nombre", v)?);
        }
        if let Some(v) = self.apellido {
            patch.insert("apellido", fields::text("apellido", v)?);
        }
        if let Some(v) = self.correo {
            patch.insert("correo", correo(v)?);
        }
        if let Some(v) = self.direccion {
            patch.insert("direccion", fields::text("direccion", v)?);
        }
        if let Some(v) = self.ubicacion {
            patch.insert("ubicacion", v.to_document());
        }
        if let Some(v) = self.fecha_registro {
            patch.insert("fecha_registro", fields::date("fecha_registro", &v)?);
        }
        if let Some(v) = self.favoritos {
            patch.insert("favoritos", v);
        }
        Ok(patch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::validate;
    use serde_json::json;

    #[test]
    fn correo_is_normalized() {
        let doc = validate::<NewUsuario>(json!({
            "nombre": " Ana ",
            "apellido": "Lopez",
            "correo": "  Ana@Example.COM ",
            "direccion": "Calle 1",
            "ubicacion": { "lat": 19.4, "lng": -99.1 },
        }))
        .unwrap();
        assert_eq!(doc.get_str("nombre").unwrap(), "Ana");
        assert_eq!(doc.get_str("correo").unwrap(), "ana@example.com");
        assert!(doc.get_datetime("fecha_registro").is_ok());
        assert!(doc.get_array("favoritos").unwrap().is_empty());
    }

    #[test]
    fn missing_ubicacion_is_rejected() {
        let err = validate::<NewUsuario>(json!({
            "nombre": "Ana",
            "apellido": "Lopez",
            "correo": "ana@example.com",
            "direccion": "Calle 1",
        }))
        .unwrap_err();
        assert!(matches!(err, ValidationError::Body(msg) if msg.contains("ubicacion")));
    }

    #[test]
    fn patch_keeps_only_present_fields() {
        let doc = validate::<UsuarioPatch>(json!({ "direccion": " Av. 2 ", "apellido": null, "extra": 1 }))
            .unwrap();
        assert_eq!(doc, doc! { "direccion": "Av. 2" });
    }
}
