//! `/product` endpoints.

use super::{body_without, entity_provides, id_arg, ids_arg, ids_or_empty, list_provides, path, query_params};
use crate::api_client::{ApiError, ApiRequest};
use crate::cache::{MutationEndpoint, QueryEndpoint};
use ledgerline_core::{TagList, TagType};
use serde_json::{json, Value};

const BASE: &str = "/product";
const PRODUCT_LISTS: [TagType; 2] = [TagType::Products, TagType::ProductsToRestock];

pub const GET_PRODUCTS: QueryEndpoint = QueryEndpoint {
    name: "getProducts",
    request: |args| Ok(ApiRequest::get(BASE).with_query(query_params(args))),
    provides: |_, result| list_provides(TagType::Products, TagType::Product, result),
};

/// Products at or below their reorder point.
pub const GET_PRODUCTS_TO_RESTOCK: QueryEndpoint = QueryEndpoint {
    name: "getProductsToRestock",
    request: |args| Ok(ApiRequest::get(format!("{BASE}/restock")).with_query(query_params(args))),
    provides: |_, result| list_provides(TagType::ProductsToRestock, TagType::Product, result),
};

pub const GET_PRODUCT: QueryEndpoint = QueryEndpoint {
    name: "getProduct",
    request: |args| Ok(ApiRequest::get(path(BASE, &id_arg(args)?))),
    provides: |args, _| entity_provides(TagType::Product, args),
};

pub const GET_STOCK_HISTORY: QueryEndpoint = QueryEndpoint {
    name: "getStockHistory",
    request: stock_history_request,
    provides: |args, _| entity_provides(TagType::StockHistoryList, args),
};

pub const CREATE_PRODUCT: MutationEndpoint = MutationEndpoint {
    name: "createProduct",
    request: |args| {
        if !args.is_object() {
            return Err(ApiError::invalid_args("product payload must be an object"));
        }
        Ok(ApiRequest::post(BASE, args.clone()))
    },
    invalidates: |_, _| product_lists(),
};

pub const UPDATE_PRODUCT: MutationEndpoint = MutationEndpoint {
    name: "updateProduct",
    request: |args| Ok(ApiRequest::patch(path(BASE, &id_arg(args)?), body_without(args, &["id"]))),
    invalidates: |args, _| {
        let mut tags = product_lists();
        tags.entity_opt(TagType::Product, id_arg(args).ok().as_ref());
        tags
    },
};

/// Receive stock: `{id, quantity, note?}`.
pub const ADD_STOCKS: MutationEndpoint = MutationEndpoint {
    name: "addStocks",
    request: |args| stock_movement_request(args, "add-stocks"),
    invalidates: stock_movement_invalidates,
};

/// Write off stock: `{id, quantity, reason?}`.
pub const REMOVE_STOCKS: MutationEndpoint = MutationEndpoint {
    name: "removeStocks",
    request: |args| stock_movement_request(args, "remove-stocks"),
    invalidates: stock_movement_invalidates,
};

pub const DELETE_PRODUCTS: MutationEndpoint = MutationEndpoint {
    name: "deleteProducts",
    request: |args| Ok(ApiRequest::delete(BASE).with_body(json!({ "ids": ids_arg(args)? }))),
    invalidates: |args, _| {
        let mut tags = product_lists();
        tags.entities(TagType::Product, &ids_or_empty(args));
        tags
    },
};

fn stock_history_request(args: &Value) -> Result<ApiRequest, ApiError> {
    let id = id_arg(args)?;
    let mut params = query_params(&body_without(args, &["id"]));
    params.sort();
    Ok(ApiRequest::get(format!("{}/stock-history", path(BASE, &id))).with_query(params))
}

fn stock_movement_request(args: &Value, action: &str) -> Result<ApiRequest, ApiError> {
    let id = id_arg(args)?;
    let quantity = args
        .get("quantity")
        .and_then(Value::as_f64)
        .filter(|quantity| *quantity > 0.0)
        .ok_or_else(|| ApiError::invalid_args("`quantity` must be a positive number"))?;
    let mut body = body_without(args, &["id"]);
    if let Value::Object(map) = &mut body {
        map.insert("quantity".to_string(), json!(quantity));
    }
    Ok(ApiRequest::post(format!("{}/{action}", path(BASE, &id)), body))
}

fn stock_movement_invalidates(args: &Value, _result: &Value) -> TagList {
    let mut tags = product_lists();
    if let Ok(id) = id_arg(args) {
        tags.entity(TagType::Product, &id)
            .entity(TagType::StockHistoryList, &id);
    }
    tags
}

fn product_lists() -> TagList {
    let mut tags = TagList::new();
    tags.lists(&PRODUCT_LISTS);
    tags
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stock_movements_match_realtime_events() {
        let args = json!({ "id": "p1", "quantity": 5 });
        let request = (ADD_STOCKS.request)(&args).unwrap();
        assert_eq!(request.path, "/product/p1/add-stocks");

        let tags = (ADD_STOCKS.invalidates)(&args, &Value::Null);
        assert_eq!(tags, ledgerline_events::tags_for("product_add_stocks", &json!("p1")));

        let tags = (REMOVE_STOCKS.invalidates)(&args, &Value::Null);
        assert_eq!(tags, ledgerline_events::tags_for("product_remove_stocks", &json!({ "id": "p1" })));
    }

    #[test]
    fn stock_movement_rejects_bad_quantity() {
        for quantity in [json!(0), json!(-2), json!("5"), Value::Null] {
            let args = json!({ "id": "p1", "quantity": quantity });
            assert!((ADD_STOCKS.request)(&args).is_err());
        }
    }

    #[test]
    fn restock_list_provides_product_rows() {
        let tags = (GET_PRODUCTS_TO_RESTOCK.provides)(&Value::Null, Some(&json!([{ "id": "p9" }])));
        let rendered: Vec<String> = tags.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, ["ProductsToRestock:LIST", "Product:p9"]);
    }

    #[test]
    fn stock_history_passes_filters() {
        let request = (GET_STOCK_HISTORY.request)(&json!({ "id": "p1", "from": "2024-01-01", "page": 2 })).unwrap();
        assert_eq!(request.path, "/product/p1/stock-history");
        assert_eq!(
            request.query,
            vec![
                ("from".to_string(), "2024-01-01".to_string()),
                ("page".to_string(), "2".to_string()),
            ]
        );
    }
}
