use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::{AppError, AppResult},
    models::CatalogItem,
};

/// A file part pulled out of a multipart form.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Raw text fields and image collected from a `multipart/form-data` body.
/// Unknown fields are ignored.
#[derive(Debug, Clone, Default)]
pub struct CatalogForm {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<String>,
    pub image: Option<UploadedImage>,
}

#[derive(Debug, Clone)]
pub struct CreateCatalogItem {
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub image: Option<UploadedImage>,
}

/// Absent fields keep their stored value. `description` is tri-state: absent
/// keeps it, a blank form field clears it, anything else replaces it.
#[derive(Debug, Clone, Default)]
pub struct UpdateCatalogItem {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub price: Option<Decimal>,
    pub image: Option<UploadedImage>,
}

impl CatalogForm {
    pub fn into_create(self) -> AppResult<CreateCatalogItem> {
        let name = non_blank(self.name)
            .ok_or_else(|| AppError::BadRequest("name is required".into()))?;
        let price = match self.price.as_deref() {
            Some(raw) => parse_price(raw)?,
            None => return Err(AppError::BadRequest("price is required".into())),
        };
        Ok(CreateCatalogItem {
            name,
            description: non_blank(self.description),
            price,
            image: self.image,
        })
    }

    pub fn into_update(self) -> AppResult<UpdateCatalogItem> {
        let price = self.price.as_deref().map(parse_price).transpose()?;
        Ok(UpdateCatalogItem {
            name: non_blank(self.name),
            description: self.description.map(|d| non_blank(Some(d))),
            price,
            image: self.image,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_price(raw: &str) -> AppResult<Decimal> {
    let price = Decimal::from_str(raw.trim())
        .map_err(|_| AppError::BadRequest(format!("price `{raw}` is not a number")))?;
    if price.is_sign_negative() {
        return Err(AppError::BadRequest("price must not be negative".into()));
    }
    Ok(price.round_dp(2))
}

/// OpenAPI shape of the multipart body accepted by catalog writes.
#[derive(ToSchema)]
pub struct CatalogUploadForm {
    pub name: String,
    pub price: String,
    pub description: Option<String>,
    #[schema(value_type = Option<String>, format = Binary)]
    pub image: Option<Vec<u8>>,
}

#[derive(Serialize, ToSchema)]
pub struct CatalogList {
    pub items: Vec<CatalogItem>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_requires_name_and_price() {
        let missing_name = CatalogForm {
            price: Some("10".into()),
            ..Default::default()
        };
        assert!(matches!(missing_name.into_create(), Err(AppError::BadRequest(_))));

        let missing_price = CatalogForm {
            name: Some("Lamp".into()),
            ..Default::default()
        };
        assert!(matches!(missing_price.into_create(), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn price_is_parsed_and_rounded_to_cents() {
        let form = CatalogForm {
            name: Some("  Lamp ".into()),
            price: Some("19.999".into()),
            description: Some("   ".into()),
            image: None,
        };
        let item = form.into_create().unwrap();
        assert_eq!(item.name, "Lamp");
        assert_eq!(item.price, Decimal::new(2000, 2));
        assert_eq!(item.description, None);
    }

    #[test]
    fn negative_or_garbage_price_is_rejected() {
        assert!(parse_price("-1").is_err());
        assert!(parse_price("ten").is_err());
    }

    #[test]
    fn update_keeps_absent_fields_unset() {
        let update = CatalogForm {
            price: Some("7.5".into()),
            ..Default::default()
        }
        .into_update()
        .unwrap();
        assert_eq!(update.price, Some(Decimal::new(75, 1)));
        assert!(update.name.is_none());
        assert!(update.description.is_none());
        assert!(update.image.is_none());
    }

    #[test]
    fn blank_description_on_update_clears_it() {
        let cleared = CatalogForm {
            description: Some("  ".into()),
            ..Default::default()
        }
        .into_update()
        .unwrap();
        assert_eq!(cleared.description, Some(None));

        let replaced = CatalogForm {
            description: Some(" Warm ".into()),
            ..Default::default()
        }
        .into_update()
        .unwrap();
        assert_eq!(replaced.description, Some(Some("Warm".into())));
    }
}
