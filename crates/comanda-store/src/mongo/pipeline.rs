use bson::{Bson, Document, doc};

use crate::pipeline::{ArrayOp, Stage};

/// Native stage document for each pipeline step.
pub(super) fn to_native(pipeline: &[Stage]) -> Vec<Document> {
    pipeline.iter().map(stage_doc).collect()
}

fn stage_doc(stage: &Stage) -> Document {
    match stage {
        Stage::Match(filter) => doc! { "$match": filter.clone() },
        Stage::ToObjectId { field, as_field } => doc! {
            "$addFields": {
                as_field.as_str(): {
                    "$convert": {
                        "input": format!("${field}"),
                        "to": "objectId",
                        "onError": Bson::Null,
                        "onNull": Bson::Null,
                    }
                }
            }
        },
        Stage::Lookup {
            from,
            local_field,
            foreign_field,
            as_field,
        } => doc! {
            "$lookup": {
                "from": from.as_str(),
                "localField": local_field.as_str(),
                "foreignField": foreign_field.as_str(),
                "as": as_field.as_str(),
            }
        },
        Stage::Unwind(path) => doc! { "$unwind": format!("${path}") },
        Stage::UpdateArray { field, op, item } => {
            let current = doc! { "$ifNull": [format!("${field}"), []] };
            // $literal keeps strings starting with '$' from reading as paths
            let operand = Bson::Array(vec![Bson::Document(doc! { "$literal": item.clone() })]);
            let operator = match op {
                ArrayOp::Push => "$concatArrays",
                ArrayOp::AddToSet => "$setUnion",
                ArrayOp::Pull => "$setDifference",
            };
            doc! { "$set": { field.as_str(): { operator: [current, operand] } } }
        }
        Stage::Merge { into } => doc! {
            "$merge": {
                "into": into.as_str(),
                "on": "_id",
                "whenMatched": "replace",
                "whenNotMatched": "discard",
            }
        },
    }
}
