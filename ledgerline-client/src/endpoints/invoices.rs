//! `/invoice` endpoints: invoices and the sales they record. Both are created
//! by booking approval and changed through the receivables workflow, so this
//! module only reads.

use super::{entity_provides, id_arg, list_provides, path, query_params};
use crate::api_client::ApiRequest;
use crate::cache::QueryEndpoint;
use ledgerline_core::TagType;

const BASE: &str = "/invoice";

pub const GET_INVOICES: QueryEndpoint = QueryEndpoint {
    name: "getInvoices",
    request: |args| Ok(ApiRequest::get(BASE).with_query(query_params(args))),
    provides: |_, result| list_provides(TagType::Invoices, TagType::Invoice, result),
};

pub const GET_INVOICE: QueryEndpoint = QueryEndpoint {
    name: "getInvoice",
    request: |args| Ok(ApiRequest::get(path(BASE, &id_arg(args)?))),
    provides: |args, _| entity_provides(TagType::Invoice, args),
};

pub const GET_SALES: QueryEndpoint = QueryEndpoint {
    name: "getSales",
    request: |args| Ok(ApiRequest::get(format!("{BASE}/sales")).with_query(query_params(args))),
    provides: |_, result| list_provides(TagType::Sales, TagType::Sale, result),
};

pub const GET_SALE: QueryEndpoint = QueryEndpoint {
    name: "getSale",
    request: |args| Ok(ApiRequest::get(format!("{BASE}/sales/{}", id_arg(args)?))),
    provides: |args, _| entity_provides(TagType::Sale, args),
};

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sale_reads_nest_under_invoice() {
        let request = (GET_SALE.request)(&json!("s1")).unwrap();
        assert_eq!(request.path, "/invoice/sales/s1");

        let tags = (GET_SALES.provides)(&json!({}), Some(&json!({ "rows": [{ "id": "s1" }] })));
        let rendered: Vec<String> = tags.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, ["Sales:LIST", "Sale:s1"]);
    }
}
