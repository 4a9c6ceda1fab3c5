//! Converting tool descriptors into upstream function declarations.

use shopchat_core::tool::{FunctionDeclaration, ToolDescriptor};

/// Hint used for tools missing from [`KEYWORD_HINTS`].
pub const GENERIC_HINT: &str = "general inquiries";

/// Customer phrasings that should trigger each storefront tool.
pub const KEYWORD_HINTS: &[(&str, &str)] = &[
    (
        "search_shop_catalog",
        "products, search, find, looking for, show me, what do you have, inventory, items, merchandise",
    ),
    (
        "get_cart",
        "cart, shopping cart, what's in my cart, cart contents, my items",
    ),
    (
        "update_cart",
        "add to cart, remove from cart, add item, buy, purchase, shopping",
    ),
    (
        "search_shop_policies_and_faqs",
        "shipping, returns, policy, FAQ, delivery, refund, exchange, terms",
    ),
    (
        "get_most_recent_order_status",
        "my orders, order history, recent orders, past purchases",
    ),
    (
        "get_order_status",
        "order status, track order, order details, order number",
    ),
    ("initiate_return", "return, refund, exchange, send back"),
];

pub fn keyword_hint(tool_name: &str) -> &'static str {
    KEYWORD_HINTS
        .iter()
        .find(|(name, _)| *name == tool_name)
        .map(|(_, hint)| *hint)
        .unwrap_or(GENERIC_HINT)
}

/// Declarations in input order, each description suffixed with its hint.
pub fn adapt_tools(tools: &[ToolDescriptor]) -> Vec<FunctionDeclaration> {
    tools
        .iter()
        .map(|t| FunctionDeclaration {
            name: t.name.clone(),
            description: format!(
                "{}\n\nUse this tool when customers ask about: {}",
                t.description,
                keyword_hint(&t.name)
            ),
            parameters: t.input_schema.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn descriptor(name: &str) -> ToolDescriptor {
        ToolDescriptor {
            name: name.into(),
            description: "Does a thing".into(),
            input_schema: json!({
                "type": "object",
                "properties": { "query": { "type": "string" } },
                "required": ["query"]
            }),
        }
    }

    #[test]
    fn known_tool_gets_its_hint() {
        let adapted = adapt_tools(&[descriptor("get_cart")]);
        assert_eq!(
            adapted[0].description,
            "Does a thing\n\nUse this tool when customers ask about: cart, shopping cart, what's in my cart, cart contents, my items"
        );
    }

    #[test]
    fn unknown_tool_gets_generic_hint() {
        let adapted = adapt_tools(&[descriptor("gift_wrap")]);
        assert!(adapted[0].description.ends_with(": general inquiries"));
    }

    #[test]
    fn schema_and_order_pass_through() {
        let tools = vec![descriptor("update_cart"), descriptor("initiate_return")];
        let adapted = adapt_tools(&tools);
        assert_eq!(adapted.len(), 2);
        assert_eq!(adapted[0].name, "update_cart");
        assert_eq!(adapted[1].name, "initiate_return");
        assert_eq!(adapted[0].parameters, tools[0].input_schema);
    }

    #[test]
    fn every_storefront_tool_has_a_hint() {
        for (name, _) in KEYWORD_HINTS {
            assert_ne!(keyword_hint(name), GENERIC_HINT);
        }
        assert_eq!(keyword_hint("search_shop_policies_and_faqs").split(", ").count(), 8);
    }
}
