/// Default page size for pagination
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Maximum page size allowed
pub const MAX_PAGE_SIZE: i64 = 100;

// =============================================================================
// CATALOG CONSTANTS
// =============================================================================

/// Separator placed between names when rendering a category's ancestry
pub const CATEGORY_PATH_SEPARATOR: &str = " -> ";

/// Total digits allowed in a product value (`NUMERIC(22, 2)`)
pub const PRODUCT_VALUE_MAX_DIGITS: u32 = 22;

/// Fractional digits allowed in a product value
pub const PRODUCT_VALUE_DECIMAL_PLACES: u32 = 2;

/// Directory segment inserted between the product slug and the image filename
pub const PRODUCT_IMAGE_DIR: &str = "product";
