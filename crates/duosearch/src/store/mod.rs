//! Relational product store backed by a polars `DataFrame`.
//!
//! This is the source of truth for product records and their canonical ids.
//! Queries run as lazy filters over the frame; pagination is a slice over the
//! filtered result, with totals reported from the full match count.

pub use error::StoreError;
use error::Result;
use itertools::izip;
use polars::prelude::*;
use tracing::{debug, instrument};

use crate::{
    backend::{BackendError, Page, PageRequest, RelationalBackend},
    model::Product,
};

const COLUMNS: [&str; 6] = [
    "id",
    "name",
    "name_exact",
    "description",
    "category",
    "price",
];

/// In-process relational store over product records.
#[derive(Debug, Clone)]
pub struct ProductStore {
    products: DataFrame,
}

impl ProductStore {
    /// Build a store from product records.
    ///
    /// Records without an id are assigned the next free canonical id, since
    /// the relational store owns id assignment.
    #[instrument(name = "Create ProductStore", skip(products), fields(num_products = products.len()))]
    pub fn from_products(products: Vec<Product>) -> Result<Self> {
        let mut next_id = products
            .iter()
            .filter_map(|p| p.id)
            .max()
            .map_or(1, |max| max + 1);

        let mut ids = Vec::with_capacity(products.len());
        let mut names = Vec::with_capacity(products.len());
        let mut names_exact = Vec::with_capacity(products.len());
        let mut descriptions = Vec::with_capacity(products.len());
        let mut categories = Vec::with_capacity(products.len());
        let mut prices = Vec::with_capacity(products.len());

        for product in products {
            let id = product.id.unwrap_or_else(|| {
                let assigned = next_id;
                next_id += 1;
                assigned
            });
            ids.push(id);
            names.push(product.name().to_string());
            names_exact.push(product.name_exact().to_string());
            descriptions.push(product.description);
            categories.push(product.category);
            prices.push(product.price);
        }

        let frame = df!(
            "id" => ids,
            "name" => names,
            "name_exact" => names_exact,
            "description" => descriptions,
            "category" => categories,
            "price" => prices,
        )?;

        debug!(rows = frame.height(), "product store populated");
        Ok(Self { products: frame })
    }

    /// Wrap an existing frame. It must carry the product columns.
    pub fn from_frame(frame: DataFrame) -> Result<Self> {
        for column in COLUMNS {
            if frame.column(column).is_err() {
                return Err(
                    anyhow::anyhow!("product frame is missing the '{column}' column").into(),
                );
            }
        }
        Ok(Self { products: frame })
    }

    /// Number of records in the store.
    pub fn len(&self) -> usize {
        self.products.height()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Case-insensitive substring match across name, description and
    /// category. Available to direct callers; the comparison path uses
    /// [`exact_search`](RelationalBackend::exact_search) instead.
    #[instrument(name = "Store Substring Search", level = "debug", skip(self))]
    pub fn substring_search(&self, term: &str, page: PageRequest) -> Result<Page<Product>> {
        let needle = term.trim().to_lowercase();
        let contains = |column: &str| {
            col(column)
                .str()
                .to_lowercase()
                .str()
                .contains_literal(lit(needle.clone()))
        };
        let matched = self
            .products
            .clone()
            .lazy()
            .filter(
                contains("name")
                    .or(contains("description"))
                    .or(contains("category")),
            )
            .collect()?;
        paginate(&matched, page)
    }

    fn exact_search_inner(&self, term: &str, page: PageRequest) -> Result<Page<Product>> {
        let needle = term.trim().to_lowercase();
        let matched = self
            .products
            .clone()
            .lazy()
            .filter(col("name").str().to_lowercase().eq(lit(needle)))
            .collect()?;
        paginate(&matched, page)
    }

    fn fetch_all_inner(&self) -> Result<Vec<Product>> {
        frame_to_products(&self.products)
    }
}

impl RelationalBackend for ProductStore {
    #[instrument(name = "Store Exact Search", level = "debug", skip(self))]
    fn exact_search(
        &self,
        term: &str,
        page: PageRequest,
    ) -> std::result::Result<Page<Product>, BackendError> {
        self.exact_search_inner(term, page).map_err(From::from)
    }

    fn fetch_all(&self) -> std::result::Result<Vec<Product>, BackendError> {
        self.fetch_all_inner().map_err(From::from)
    }
}

fn paginate(matched: &DataFrame, page: PageRequest) -> Result<Page<Product>> {
    if page.size == 0 {
        return Err(anyhow::anyhow!("page size must be positive").into());
    }
    let total_elements = matched.height() as u64;
    let total_pages = matched.height().div_ceil(page.size);
    let offset = page.page.saturating_mul(page.size);
    let window = matched.slice(offset as i64, page.size);

    Ok(Page {
        content: frame_to_products(&window)?,
        total_pages,
        total_elements,
    })
}

fn frame_to_products(frame: &DataFrame) -> Result<Vec<Product>> {
    let id_series = frame.column("id")?.cast(&DataType::UInt64)?;
    let id_series = id_series.u64()?;
    let name_series = frame.column("name")?.str()?;
    let description_series = frame.column("description")?.str()?;
    let category_series = frame.column("category")?.str()?;
    let price_series = frame.column("price")?.f64()?;

    let mut products = Vec::with_capacity(frame.height());
    for (id, name, description, category, price) in izip!(
        id_series,
        name_series,
        description_series,
        category_series,
        price_series
    ) {
        if let (Some(id), Some(name)) = (id, name) {
            products.push(
                Product::new(
                    name,
                    description.unwrap_or_default(),
                    category.unwrap_or_default(),
                    price.unwrap_or_default(),
                )
                .with_id(id),
            );
        }
    }
    Ok(products)
}

mod error {
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum StoreError {
        #[error("DataFrame error: {0}")]
        DataFrame(#[from] polars::prelude::PolarsError),
        #[error(transparent)]
        Other(#[from] anyhow::Error),
    }
    pub type Result<T> = std::result::Result<T, StoreError>;
}
