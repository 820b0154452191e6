//! GraphQL operations for the Shopify Storefront API.
//!
//! Each operation is a unit struct implementing [`GraphQLQuery`] plus a
//! snake-case module holding its document, `Variables` and `ResponseData`,
//! mirroring the layout `graphql_client`'s derive generates. Values always
//! travel as variables; documents are never formatted.

use graphql_client::{GraphQLQuery, QueryBody};
use heedless_core::{CheckoutId, Handle, ProductId, VariantId};
use serde::{Deserialize, Serialize};

macro_rules! operation {
    ($name:ident, $module:ident) => {
        pub struct $name;

        impl GraphQLQuery for $name {
            type Variables = $module::Variables;
            type ResponseData = $module::ResponseData;

            fn build_query(variables: Self::Variables) -> QueryBody<Self::Variables> {
                QueryBody {
                    variables,
                    query: $module::QUERY,
                    operation_name: $module::OPERATION_NAME,
                }
            }
        }
    };
}

macro_rules! checkout_fields {
    () => {
        "id webUrl email \
         lineItems(first: 250) { edges { node { title quantity \
         variant { id title price { amount currencyCode } } } } }"
    };
}

macro_rules! listing_fields {
    () => {
        "id handle title \
         images(first: 1) { edges { node { url altText } } } \
         collections(first: 5) { edges { node { handle } } } \
         priceRange { minVariantPrice { amount currencyCode } }"
    };
}

// =============================================================================
// Shared response shapes
// =============================================================================

/// A Relay connection (`{ edges: [{ node }] }`).
#[derive(Debug, Clone, Deserialize)]
pub struct Connection<T> {
    #[serde(default = "Vec::new")]
    pub edges: Vec<Edge<T>>,
}

impl<T> Connection<T> {
    /// Flatten `edges[].node` into a plain list.
    pub fn into_nodes(self) -> Vec<T> {
        self.edges.into_iter().map(|edge| edge.node).collect()
    }
}

impl<T> Default for Connection<T> {
    fn default() -> Self {
        Self { edges: Vec::new() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Edge<T> {
    pub node: T,
}

/// `MoneyV2`: decimal string plus ISO currency code.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Money {
    pub amount: String,
    pub currency_code: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageNode {
    pub url: String,
    pub alt_text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HandleNode {
    pub handle: Handle,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceRange {
    pub min_variant_price: Money,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserError {
    #[serde(default)]
    pub field: Option<Vec<String>>,
    pub message: String,
}

/// A product as listed by collections and search.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingProduct {
    pub id: ProductId,
    pub handle: Handle,
    pub title: String,
    #[serde(default)]
    pub images: Connection<ImageNode>,
    #[serde(default)]
    pub collections: Connection<HandleNode>,
    pub price_range: Option<PriceRange>,
}

/// A checkout with its line items.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutNode {
    pub id: CheckoutId,
    pub web_url: String,
    pub email: Option<String>,
    #[serde(default)]
    pub line_items: Connection<CheckoutLineItemNode>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutLineItemNode {
    pub title: String,
    pub quantity: i64,
    pub variant: Option<CheckoutVariantNode>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutVariantNode {
    pub id: VariantId,
    pub title: String,
    pub price: Option<Money>,
}

/// `CheckoutLineItemInput`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItemInput {
    pub variant_id: VariantId,
    pub quantity: u32,
}

// =============================================================================
// Checkout operations
// =============================================================================

operation!(CreateCheckout, create_checkout);

pub mod create_checkout {
    use super::{CheckoutNode, LineItemInput, UserError};
    use serde::{Deserialize, Serialize};

    pub const OPERATION_NAME: &str = "CreateCheckout";
    pub const QUERY: &str = concat!(
        "mutation CreateCheckout($input: CheckoutCreateInput!) { ",
        "checkoutCreate(input: $input) { checkout { ",
        checkout_fields!(),
        " } checkoutUserErrors { field message } } }"
    );

    #[derive(Debug, Clone, Serialize)]
    pub struct Variables {
        pub input: CheckoutCreateInput,
    }

    #[derive(Debug, Clone, Serialize, Default)]
    #[serde(rename_all = "camelCase")]
    pub struct CheckoutCreateInput {
        pub line_items: Vec<LineItemInput>,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResponseData {
        pub checkout_create: Option<Payload>,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Payload {
        pub checkout: Option<CheckoutNode>,
        #[serde(default)]
        pub checkout_user_errors: Vec<UserError>,
    }
}

operation!(CheckoutLineItems, checkout_line_items);

pub mod checkout_line_items {
    use super::CheckoutNode;
    use heedless_core::CheckoutId;
    use serde::{Deserialize, Serialize};

    pub const OPERATION_NAME: &str = "CheckoutLineItems";
    pub const QUERY: &str = concat!(
        "query CheckoutLineItems($id: ID!) { node(id: $id) { ... on Checkout { ",
        checkout_fields!(),
        " } } }"
    );

    #[derive(Debug, Clone, Serialize)]
    pub struct Variables {
        pub id: CheckoutId,
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct ResponseData {
        pub node: Option<CheckoutNode>,
    }
}

operation!(ReplaceLineItems, replace_line_items);

pub mod replace_line_items {
    use super::{CheckoutNode, LineItemInput, UserError};
    use heedless_core::CheckoutId;
    use serde::{Deserialize, Serialize};

    pub const OPERATION_NAME: &str = "ReplaceLineItems";
    pub const QUERY: &str = concat!(
        "mutation ReplaceLineItems($checkoutId: ID!, $lineItems: [CheckoutLineItemInput!]!) { ",
        "checkoutLineItemsReplace(checkoutId: $checkoutId, lineItems: $lineItems) { checkout { ",
        checkout_fields!(),
        " } userErrors { field message } } }"
    );

    #[derive(Debug, Clone, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Variables {
        pub checkout_id: CheckoutId,
        pub line_items: Vec<LineItemInput>,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResponseData {
        pub checkout_line_items_replace: Option<Payload>,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Payload {
        pub checkout: Option<CheckoutNode>,
        #[serde(default)]
        pub user_errors: Vec<UserError>,
    }
}

operation!(UpdateCheckoutEmail, update_checkout_email);

pub mod update_checkout_email {
    use super::{CheckoutNode, UserError};
    use heedless_core::CheckoutId;
    use serde::{Deserialize, Serialize};

    pub const OPERATION_NAME: &str = "UpdateCheckoutEmail";
    pub const QUERY: &str = concat!(
        "mutation UpdateCheckoutEmail($checkoutId: ID!, $email: String!) { ",
        "checkoutEmailUpdateV2(checkoutId: $checkoutId, email: $email) { checkout { ",
        checkout_fields!(),
        " } checkoutUserErrors { field message } } }"
    );

    #[derive(Debug, Clone, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Variables {
        pub checkout_id: CheckoutId,
        pub email: String,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResponseData {
        #[serde(rename = "checkoutEmailUpdateV2")]
        pub checkout_email_update: Option<Payload>,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Payload {
        pub checkout: Option<CheckoutNode>,
        #[serde(default)]
        pub checkout_user_errors: Vec<UserError>,
    }
}

// =============================================================================
// Shop
// =============================================================================

operation!(ShipsToCountries, ships_to_countries);

pub mod ships_to_countries {
    use serde::{Deserialize, Serialize};

    pub const OPERATION_NAME: &str = "ShipsToCountries";
    pub const QUERY: &str = "query ShipsToCountries { shop { shipsToCountries } }";

    #[derive(Debug, Clone, Serialize, Default)]
    pub struct Variables {}

    #[derive(Debug, Clone, Deserialize)]
    pub struct ResponseData {
        pub shop: Shop,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Shop {
        #[serde(default)]
        pub ships_to_countries: Vec<String>,
    }
}

// =============================================================================
// Catalog
// =============================================================================

operation!(CollectionByHandle, collection_by_handle);

pub mod collection_by_handle {
    use super::{Connection, ListingProduct};
    use heedless_core::Handle;
    use serde::{Deserialize, Serialize};

    pub const OPERATION_NAME: &str = "CollectionByHandle";
    pub const QUERY: &str = concat!(
        "query CollectionByHandle($handle: String!, $first: Int!) { ",
        "collection(handle: $handle) { handle title ",
        "products(first: $first) { edges { node { ",
        listing_fields!(),
        " } } } } }"
    );

    #[derive(Debug, Clone, Serialize)]
    pub struct Variables {
        pub handle: Handle,
        pub first: u32,
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct ResponseData {
        pub collection: Option<CollectionNode>,
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct CollectionNode {
        pub handle: Handle,
        pub title: String,
        #[serde(default)]
        pub products: Connection<ListingProduct>,
    }
}

operation!(ProductByHandle, product_by_handle);

pub mod product_by_handle {
    use super::{Connection, HandleNode, ImageNode, Money, PriceRange};
    use heedless_core::{Handle, ProductId, VariantId};
    use serde::{Deserialize, Serialize};

    pub const OPERATION_NAME: &str = "ProductByHandle";
    pub const QUERY: &str = "query ProductByHandle($handle: String!) { \
        product(handle: $handle) { id handle title descriptionHtml \
        images(first: 10) { edges { node { url altText } } } \
        variants(first: 10) { edges { node { id title quantityAvailable price { amount currencyCode } } } } \
        collections(first: 5) { edges { node { handle } } } \
        priceRange { minVariantPrice { amount currencyCode } } } }";

    #[derive(Debug, Clone, Serialize)]
    pub struct Variables {
        pub handle: Handle,
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct ResponseData {
        pub product: Option<ProductNode>,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ProductNode {
        pub id: ProductId,
        pub handle: Handle,
        pub title: String,
        pub description_html: Option<String>,
        #[serde(default)]
        pub images: Connection<ImageNode>,
        #[serde(default)]
        pub variants: Connection<VariantNode>,
        #[serde(default)]
        pub collections: Connection<HandleNode>,
        pub price_range: Option<PriceRange>,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct VariantNode {
        pub id: VariantId,
        pub title: String,
        pub quantity_available: Option<i64>,
        pub price: Money,
    }
}

operation!(SearchProducts, search_products);

pub mod search_products {
    use super::{Connection, ListingProduct};
    use serde::{Deserialize, Serialize};

    pub const OPERATION_NAME: &str = "SearchProducts";
    pub const QUERY: &str = concat!(
        "query SearchProducts($query: String!, $first: Int!) { ",
        "products(first: $first, query: $query) { edges { node { ",
        listing_fields!(),
        " } } } }"
    );

    #[derive(Debug, Clone, Serialize)]
    pub struct Variables {
        pub query: String,
        pub first: u32,
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct ResponseData {
        #[serde(default)]
        pub products: Connection<ListingProduct>,
    }
}
