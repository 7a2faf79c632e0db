use utoipa::{Modify, OpenApi};

use crate::features::categories::{dtos as categories_dtos, handlers as categories_handlers};
use crate::features::products::{dtos as products_dtos, handlers as products_handlers};
use crate::shared::types::{ApiResponse, Meta};

#[derive(OpenApi)]
#[openapi(
    paths(
        // Categories
        categories_handlers::list_categories,
        categories_handlers::create_category,
        categories_handlers::get_category,
        categories_handlers::get_category_by_slug,
        categories_handlers::update_category,
        categories_handlers::get_category_path,
        categories_handlers::delete_category,
        // Products
        products_handlers::list_products,
        products_handlers::create_product,
        products_handlers::get_product,
        products_handlers::get_product_by_slug,
        products_handlers::update_product,
        products_handlers::delete_product,
        products_handlers::upload_product_image,
    ),
    components(
        schemas(
            Meta,
            // Categories
            ApiResponse<categories_dtos::CategoryResponseDto>,
            ApiResponse<Vec<categories_dtos::CategoryResponseDto>>,
            ApiResponse<categories_dtos::CategoryPathDto>,
            ApiResponse<categories_dtos::DeleteCategoryResponseDto>,
            categories_dtos::SaveCategoryDto,
            categories_dtos::CategoryResponseDto,
            categories_dtos::CategoryPathDto,
            categories_dtos::CategoryTreeDto,
            categories_dtos::DeleteCategoryResponseDto,
            // Products
            ApiResponse<products_dtos::ProductResponseDto>,
            ApiResponse<Vec<products_dtos::ProductResponseDto>>,
            ApiResponse<products_dtos::DeleteProductResponseDto>,
            products_dtos::SaveProductDto,
            products_dtos::ProductResponseDto,
            products_dtos::UploadImageDto,
            products_dtos::DeleteProductResponseDto,
        )
    ),
    tags(
        (name = "categories", description = "Hierarchical product categories"),
        (name = "products", description = "Products and their images"),
    ),
    info(
        title = "Catalog API",
        version = "0.1.0",
        description = "API documentation for the product catalog",
    )
)]
pub struct ApiDoc;

/// Modifier to override OpenAPI info from config
pub struct SwaggerInfoModifier {
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Modify for SwaggerInfoModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.info.title = self.title.clone();
        openapi.info.version = self.version.clone();
        openapi.info.description = Some(self.description.clone());
    }
}
