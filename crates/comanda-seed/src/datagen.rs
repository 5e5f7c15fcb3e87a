use bson::oid::ObjectId;
use bson::{Bson, DateTime, Document, doc};
use rand::Rng;
use rand::seq::SliceRandom;

const NOMBRES: &[&str] = &[
    "Ana", "Luis", "Sofia", "Carlos", "Valeria", "Jorge", "Camila", "Diego", "Fernanda", "Miguel",
    "Lucia", "Ricardo", "Daniela", "Andres", "Paola", "Javier", "Mariana", "Emilio", "Regina",
    "Hector",
];

const APELLIDOS: &[&str] = &[
    "Garcia",
    "Hernandez",
    "Lopez",
    "Martinez",
    "Gonzalez",
    "Perez",
    "Rodriguez",
    "Sanchez",
    "Ramirez",
    "Torres",
    "Flores",
    "Rivera",
    "Gomez",
    "Diaz",
    "Cruz",
    "Morales",
    "Reyes",
    "Ortiz",
    "Castillo",
    "Vargas",
];

const DOMINIOS: &[&str] = &["example.com", "correo.mx", "mail.test"];

const CALLES: &[&str] = &[
    "Av. Reforma",
    "Calle Madero",
    "Av. Insurgentes",
    "Calle Hidalgo",
    "Av. Juarez",
    "Calle Morelos",
    "Av. Universidad",
    "Calle Allende",
];

const CIUDADES: &[&str] = &["CDMX", "Guadalajara", "Monterrey", "Puebla", "Queretaro", "Merida"];

pub const CATEGORIAS: &[&str] = &[
    "italiano",
    "mexicano",
    "japonés",
    "cafetería",
    "postres",
    "fast food",
];

const PREFIJOS: &[&str] = &["La", "El", "Casa", "Cocina", "Rincon", "Fonda"];

const SUFIJOS: &[&str] = &[
    "Esquina", "Jardin", "Sabor", "Mesa", "Parrilla", "Terraza", "Abuela", "Puerto",
];

const PLATILLOS: &[&str] = &[
    "Tacos", "Pizza", "Ramen", "Enchiladas", "Lasagna", "Sushi", "Pozole", "Hamburguesa", "Flan",
    "Churros", "Ensalada", "Risotto", "Tamales", "Gyoza", "Brownie", "Cafe",
];

const ESTILOS: &[&str] = &[
    "de la casa",
    "especial",
    "tradicional",
    "picante",
    "vegetariano",
    "del chef",
];

const ADJETIVOS: &[&str] = &[
    "crujiente",
    "casero",
    "fresco",
    "artesanal",
    "ligero",
    "abundante",
];

pub const ESTADOS: &[&str] = &["pendiente", "en_progreso", "completada", "cancelada"];

const COMENTARIOS: &[&str] = &[
    "Excelente servicio",
    "La comida llego fria",
    "Muy buen sabor",
    "Tardaron demasiado",
    "Volveria a pedir",
    "Porciones pequenas",
    "Todo perfecto",
    "Buena relacion calidad precio",
];

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

fn pick<'a, R: Rng>(rng: &mut R, pool: &[&'a str]) -> &'a str {
    pool[rng.gen_range(0..pool.len())]
}

fn days_ago<R: Rng>(rng: &mut R, now: DateTime, max_days: i64) -> DateTime {
    DateTime::from_millis(now.timestamp_millis() - rng.gen_range(0..max_days * DAY_MS))
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn ubicacion<R: Rng>(rng: &mut R) -> Document {
    doc! {
        "lat": round2(rng.gen_range(14.5..32.7)),
        "lng": round2(rng.gen_range(-117.1..-86.7)),
    }
}

fn direccion<R: Rng>(rng: &mut R) -> String {
    format!(
        "{} {}, {}",
        pick(rng, CALLES),
        rng.gen_range(1..2000),
        pick(rng, CIUDADES)
    )
}

/// `seq` keeps `correo` unique across the whole batch.
pub fn usuario<R: Rng>(rng: &mut R, seq: usize, now: DateTime) -> Document {
    let nombre = pick(rng, NOMBRES);
    let apellido = pick(rng, APELLIDOS);
    let correo = format!(
        "{}.{}{seq}@{}",
        nombre.to_lowercase(),
        apellido.to_lowercase(),
        pick(rng, DOMINIOS)
    );
    doc! {
        "nombre": nombre,
        "apellido": apellido,
        "correo": correo,
        "direccion": direccion(rng),
        "ubicacion": ubicacion(rng),
        "fecha_registro": days_ago(rng, now, 730),
        "favoritos": [],
    }
}

pub fn restaurante<R: Rng>(rng: &mut R) -> Document {
    let nombre = format!("{} {}", pick(rng, PREFIJOS), pick(rng, SUFIJOS));
    let count = rng.gen_range(1..=3);
    let categorias: Vec<Bson> = CATEGORIAS
        .choose_multiple(rng, count)
        .map(|c| Bson::from(*c))
        .collect();
    doc! {
        "nombre": nombre,
        "direccion": direccion(rng),
        "ubicacion": ubicacion(rng),
        "calificacion_promedio": round2(rng.gen_range(2.0..=5.0)),
        "categorias": categorias,
        "menu": [],
    }
}

pub fn articulo<R: Rng>(rng: &mut R, restaurante_id: ObjectId) -> Document {
    let platillo = pick(rng, PLATILLOS);
    doc! {
        "nombre": format!("{platillo} {}", pick(rng, ESTILOS)),
        "descripcion": format!("{platillo} {}", pick(rng, ADJETIVOS)),
        "precio": round2(rng.gen_range(2.0..=30.0)),
        "restaurante_id": restaurante_id,
        "disponible": rng.gen_bool(0.9),
    }
}

/// A menu item as the order pipeline sees it: id and unit price.
#[derive(Debug, Clone, Copy)]
pub struct MenuEntry {
    pub id: ObjectId,
    pub precio: f64,
}

pub fn orden<R: Rng>(
    rng: &mut R,
    usuario_id: ObjectId,
    restaurante_id: ObjectId,
    menu: &[MenuEntry],
    now: DateTime,
) -> Document {
    let lines = rng.gen_range(1..=5).min(menu.len());
    let mut total = 0.0;
    let articulos: Vec<Bson> = menu
        .choose_multiple(rng, lines)
        .map(|entry| {
            let cantidad: i32 = rng.gen_range(1..=5);
            total += entry.precio * f64::from(cantidad);
            Bson::Document(doc! {
                "articulo_id": entry.id,
                "cantidad": cantidad,
                "precio_unitario": entry.precio,
            })
        })
        .collect();
    doc! {
        "usuario_id": usuario_id,
        "restaurante_id": restaurante_id,
        "articulos": articulos,
        "estado": pick(rng, ESTADOS),
        "total": round2(total),
        "fecha_pedido": days_ago(rng, now, 180),
    }
}

/// Review written some time between the order and `now`.
pub fn resena<R: Rng>(rng: &mut R, orden: &Document, now: DateTime) -> Option<Document> {
    let orden_id = orden.get_object_id("_id").ok()?;
    let usuario_id = orden.get_object_id("usuario_id").ok()?;
    let restaurante_id = orden.get_object_id("restaurante_id").ok()?;
    let placed = orden
        .get_datetime("fecha_pedido")
        .map_or(now.timestamp_millis(), |d| d.timestamp_millis());
    let fecha = DateTime::from_millis(rng.gen_range(placed..=now.timestamp_millis().max(placed)));
    Some(doc! {
        "usuario_id": usuario_id,
        "restaurante_id": restaurante_id,
        "orden_id": orden_id,
        "calificacion": rng.gen_range(0..=5),
        "comentario": pick(rng, COMENTARIOS),
        "fecha": fecha,
    })
}
