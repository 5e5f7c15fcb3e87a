use bson::{Bson, Document, doc};
use serde::Deserialize;

use super::fields;
use super::{Entity, Reference, Schema, ValidationError};

pub struct Orden;

impl Entity for Orden {
    const COLLECTION: &'static str = "Orden";
    const LABEL: &'static str = "Orden";
    const PLURAL: &'static str = "órdenes";
    const BULK_DELETED: &'static str = "Órdenes eliminadas exitosamente";
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
            path: "articulos.articulo_id",
            collection: "ArticuloMenu",
        },
    ];
    const ID_FIELDS: &'static [&'static str] = &["_id", "usuario_id", "restaurante_id"];

    type New = NewOrden;
    type Patch = OrdenPatch;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Estado {
    #[default]
    Pendiente,
    EnProgreso,
    Completada,
    Cancelada,
}

impl Estado {
    pub fn as_str(self) -> &'static str {
        match self {
            Estado::Pendiente => "pendiente",
            Estado::EnProgreso => "en_progreso",
            Estado::Completada => "completada",
            Estado::Cancelada => "cancelada",
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LineaOrden {
    pub articulo_id: String,
    pub cantidad: i32,
    pub precio_unitario: f64,
}

impl LineaOrden {
    fn into_bson(self) -> Result<Bson, ValidationError> {
        if self.cantidad < 1 {
            return Err(ValidationError::Range {
                field: "cantidad",
                min: 1.0,
                max: None,
            });
        }
        Ok(Bson::Document(doc! {
            "articulo_id": fields::object_id("articulo_id", &self.articulo_id)?,
            "cantidad": self.cantidad,
            "precio_unitario": fields::at_least("precio_unitario", self.precio_unitario, 0.0)?,
        }))
    }
}

fn lineas(items: Vec<LineaOrden>) -> Result<Bson, ValidationError> {
    items
        .into_iter()
        .map(LineaOrden::into_bson)
        .collect::<Result<Vec<_>, _>>()
        .map(Bson::Array)
}

fn total(value: f64) -> Result<f64, ValidationError> {
    fields::at_least("total", value, 0.0)
}

#[derive(Debug, Deserialize)]
pub struct NewOrden {
    pub usuario_id: String,
    pub restaurante_id: String,
    #[serde(default)]
    pub articulos: Vec<LineaOrden>,
    #[serde(default)]
    pub estado: Estado,
    pub total: f64,
    pub fecha_pedido: Option<String>,
}

impl Schema for NewOrden {
    fn into_document(self) -> Result<Document, ValidationError> {
        Ok(doc! {
            "usuario_id": fields::object_id("usuario_id", &self.usuario_id)?,
            "restaurante_id": fields::object_id("restaurante_id", &self.restaurante_id)?,
            "articulos": lineas(self.articulos)?,
            "estado": self.estado.as_str(),
            "total": total(self.total)?,
            "fecha_pedido": fields::date_or_now("fecha_pedido", self.fecha_pedido.as_deref())?,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct OrdenPatch {
    pub usuario_id: Option<String>,
    pub restaurante_id: Option<String>,
    pub articulos: Option<Vec<LineaOrden>>,
    pub estado: Option<Estado>,
    pub total: Option<f64>,
    pub fecha_pedido: Option<String>,
}

impl Schema for OrdenPatch {
    fn into_document(self) -> Result<Document, ValidationError> {
        let mut patch = Document::new();
        if let Some(v) = self.usuario_id {
            patch.insert("usuario_id", fields::object_id("usuario_id", &v)?);
        }
        if let Some(v) = self.restaurante_id {
            patch.insert("restaurante_id", fields::object_id("restaurante_id", &v)?);
        }
        if let Some(v) = self.articulos {
            patch.insert("articulos", lineas(v)?);
        }
        if let Some(v) = self.estado {
            patch.insert("estado", v.as_str());
        }
        if let Some(v) = self.total {
            patch.insert("total", total(v)?);
        }
        if let Some(v) = self.fecha_pedido {
            patch.insert("fecha_pedido", fields::date("fecha_pedido", &v)?);
        }
        Ok(patch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::validate;
    use bson::oid::ObjectId;
    use serde_json::json;

    fn body() -> serde_json::Value {
        json!({
            "usuario_id": ObjectId::new().to_hex(),
            "restaurante_id": ObjectId::new().to_hex(),
            "articulos": [
                { "articulo_id": ObjectId::new().to_hex(), "cantidad": 2, "precio_unitario": 10.0 }
            ],
            "total": 20.0,
        })
    }

    #[test]
    fn estado_defaults_to_pendiente() {
        let doc = validate::<NewOrden>(body()).unwrap();
        assert_eq!(doc.get_str("estado").unwrap(), "pendiente");
        assert!(doc.get_object_id("usuario_id").is_ok());
    }

    #[test]
    fn unknown_estado_is_rejected() {
        let mut b = body();
        b["estado"] = json!("entregada");
        assert!(matches!(
            validate::<NewOrden>(b),
            Err(ValidationError::Body(_))
        ));
    }

    #[test]
    fn zero_quantity_is_rejected() {
        let mut b = body();
        b["articulos"][0]["cantidad"] = json!(0);
        assert_eq!(
            validate::<NewOrden>(b).unwrap_err(),
            ValidationError::Range {
                field: "cantidad",
                min: 1.0,
                max: None,
            }
        );
    }

    #[test]
    fn bad_reference_is_rejected() {
        let mut b = body();
        b["usuario_id"] = json!("abc");
        assert!(matches!(
            validate::<NewOrden>(b),
            Err(ValidationError::Invalid { field: "usuario_id", .. })
        ));
    }
}
