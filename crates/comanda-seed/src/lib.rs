//! Fake data for the ordering platform: users, restaurants with their menus,
//! orders against those menus and one review per order.

mod datagen;

use bson::oid::ObjectId;
use bson::{Bson, DateTime, Document, doc};
use comanda_store::{DocumentStore, StoreError};
use rand::Rng;
use rand::seq::SliceRandom;

use datagen::MenuEntry;

pub use datagen::{CATEGORIAS, ESTADOS};

/// How many documents of each kind to generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedConfig {
    pub usuarios: usize,
    pub restaurantes: usize,
    pub articulos_por_restaurante: usize,
    pub ordenes: usize,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            usuarios: 10_000,
            restaurantes: 1_000,
            articulos_por_restaurante: 15,
            ordenes: 20_000,
        }
    }
}

impl SeedConfig {
    /// Keep the default proportions for `usuarios` users.
    pub fn scaled(usuarios: usize) -> Self {
        Self {
            usuarios,
            restaurantes: (usuarios / 10).max(1),
            articulos_por_restaurante: 15,
            ordenes: usuarios * 2,
        }
    }

    /// Read the user count from an optional `COMANDA_SEED` value. Unset or
    /// blank means the defaults; anything else must be a non-negative integer.
    pub fn from_var(raw: Option<&str>) -> Result<Self, String> {
        match raw.map(str::trim) {
            None | Some("") => Ok(Self::default()),
            Some(value) => value
                .parse()
                .map(Self::scaled)
                .map_err(|_| format!("invalid value for COMANDA_SEED: '{value}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub usuarios: usize,
    pub restaurantes: usize,
    pub articulos: usize,
    pub ordenes: usize,
    pub resenas: usize,
}

fn ids(docs: &[Document]) -> Vec<ObjectId> {
    docs.iter()
        .filter_map(|d| d.get_object_id("_id").ok())
        .collect()
}

/// Generate and insert a full data set. References between collections are
/// stored as `ObjectId`s, and every restaurant's `menu` lists its items.
pub fn seed<R: Rng>(
    store: &dyn DocumentStore,
    config: &SeedConfig,
    rng: &mut R,
) -> Result<SeedReport, StoreError> {
    let now = DateTime::now();
    let mut report = SeedReport::default();

    let usuarios: Vec<Document> = (0..config.usuarios)
        .map(|i| datagen::usuario(rng, i, now))
        .collect();
    let usuario_ids = ids(&store.insert_many("Usuario", usuarios)?);
    report.usuarios = usuario_ids.len();
    tracing::info!(count = report.usuarios, "seeded usuarios");

    let restaurantes: Vec<Document> = (0..config.restaurantes)
        .map(|_| datagen::restaurante(rng))
        .collect();
    let restaurante_ids = ids(&store.insert_many("Restaurante", restaurantes)?);
    report.restaurantes = restaurante_ids.len();
    tracing::info!(count = report.restaurantes, "seeded restaurantes");

    let mut menus: Vec<Vec<MenuEntry>> = Vec::with_capacity(restaurante_ids.len());
    for restaurante_id in &restaurante_ids {
        let items: Vec<Document> = (0..config.articulos_por_restaurante)
            .map(|_| datagen::articulo(rng, *restaurante_id))
            .collect();
        let stored = store.insert_many("ArticuloMenu", items)?;
        let menu: Vec<MenuEntry> = stored
            .iter()
            .filter_map(|d| {
                Some(MenuEntry {
                    id: d.get_object_id("_id").ok()?,
                    precio: d.get_f64("precio").ok()?,
                })
            })
            .collect();
        let menu_ids: Vec<Bson> = menu.iter().map(|m| Bson::ObjectId(m.id)).collect();
        store.update_one(
            "Restaurante",
            &doc! { "_id": *restaurante_id },
            &doc! { "$set": { "menu": menu_ids } },
        )?;
        report.articulos += menu.len();
        menus.push(menu);
    }
    tracing::info!(count = report.articulos, "seeded articulos");

    if usuario_ids.is_empty() || menus.iter().all(Vec::is_empty) {
        return Ok(report);
    }

    let mut ordenes = Vec::with_capacity(config.ordenes);
    while ordenes.len() < config.ordenes {
        let idx = rng.gen_range(0..restaurante_ids.len());
        if menus[idx].is_empty() {
            continue;
        }
        let Some(usuario_id) = usuario_ids.choose(rng) else {
            break;
        };
        ordenes.push(datagen::orden(
            rng,
            *usuario_id,
            restaurante_ids[idx],
            &menus[idx],
            now,
        ));
    }
    let ordenes = store.insert_many("Orden", ordenes)?;
    report.ordenes = ordenes.len();
    tracing::info!(count = report.ordenes, "seeded ordenes");

    let resenas: Vec<Document> = ordenes
        .iter()
        .filter_map(|o| datagen::resena(rng, o, now))
        .collect();
    report.resenas = store.insert_many("Resena", resenas)?.len();
    tracing::info!(count = report.resenas, "seeded resenas");

    Ok(report)
}
