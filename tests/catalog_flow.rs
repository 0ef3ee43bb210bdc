use std::{path::Path, str::FromStr};

use rust_decimal::Decimal;
use storefront_api::{
    catalog::{CatalogRef, CatalogSource},
    config::AppConfig,
    db::{create_pool, run_migrations},
    dto::catalog::{CreateCatalogItem, UpdateCatalogItem, UploadedImage},
    error::AppError,
    middleware::auth::{ADMIN_ROLE, AuthUser},
    routes::params::CatalogQuery,
    services::catalog_service,
    state::AppState,
};
use uuid::Uuid;

const PUBLIC_BASE_URL: &str = "http://localhost";

fn png(file_name: &str, bytes: &[u8]) -> UploadedImage {
    UploadedImage {
        file_name: file_name.into(),
        content_type: Some("image/png".into()),
        bytes: bytes.to_vec(),
    }
}

fn stored_path(state: &AppState, url: &str) -> std::path::PathBuf {
    let key = url
        .strip_prefix(&format!("{PUBLIC_BASE_URL}/uploads/"))
        .expect("local upload url");
    state.config.upload_dir.join(key)
}

// Integration flow: admin creates an item with an image, replaces the image,
// clears the description and deletes the item; stored files follow the row.
#[tokio::test]
async fn catalog_item_and_image_lifecycle() -> anyhow::Result<()> {
    // Allow skipping when no DB is configured in the environment.
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let admin = AuthUser {
        user_id: Uuid::new_v4(),
        role: ADMIN_ROLE.into(),
    };
    let shopper = AuthUser {
        user_id: Uuid::new_v4(),
        role: "user".into(),
    };
    let name = format!("Desk Lamp {}", Uuid::new_v4());

    let err = catalog_service::create_item(
        &state,
        &shopper,
        CatalogSource::Electronics,
        CreateCatalogItem {
            name: name.clone(),
            description: None,
            price: Decimal::ONE,
            image: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    let created = catalog_service::create_item(
        &state,
        &admin,
        CatalogSource::Electronics,
        CreateCatalogItem {
            name: name.clone(),
            description: Some("Warm light".into()),
            price: Decimal::from_str("24.50")?,
            image: Some(png("lamp.png", b"first")),
        },
    )
    .await?
    .data
    .unwrap();
    let first_url = created.image.clone().expect("image url saved on row");
    let first_path = stored_path(&state, &first_url);
    assert_eq!(tokio::fs::read(&first_path).await?, b"first");

    let fetched = catalog_service::get_item(&state, CatalogSource::Electronics, created.id)
        .await?
        .data
        .unwrap();
    assert_eq!(fetched.image.as_deref(), Some(first_url.as_str()));

    let listed = catalog_service::list_items(
        &state,
        CatalogSource::Electronics,
        CatalogQuery {
            q: Some(name.clone()),
            ..Default::default()
        },
    )
    .await?;
    assert_eq!(listed.data.unwrap().items.len(), 1);

    // The same id is unknown to the other catalog.
    let err = catalog_service::get_item(&state, CatalogSource::Products, created.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ProductNotFound(CatalogRef::Products(_))));

    let updated = catalog_service::update_item(
        &state,
        &admin,
        CatalogSource::Electronics,
        created.id,
        UpdateCatalogItem {
            description: Some(None),
            image: Some(png("lamp-v2.png", b"second")),
            ..Default::default()
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(updated.name, name);
    assert_eq!(updated.price, Decimal::from_str("24.50")?);
    assert_eq!(updated.description, None);
    let second_url = updated.image.clone().expect("replacement url");
    assert_ne!(second_url, first_url);
    assert!(!first_path.exists(), "replaced image should be removed");
    let second_path = stored_path(&state, &second_url);
    assert_eq!(tokio::fs::read(&second_path).await?, b"second");

    let err = catalog_service::delete_item(&state, &shopper, CatalogSource::Electronics, created.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    catalog_service::delete_item(&state, &admin, CatalogSource::Electronics, created.id).await?;
    assert!(!second_path.exists(), "deleted item's image should be removed");

    let err = catalog_service::get_item(&state, CatalogSource::Electronics, created.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ProductNotFound(CatalogRef::Electronics(id)) if id == created.id));

    let err = catalog_service::delete_item(&state, &admin, CatalogSource::Electronics, created.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ProductNotFound(_)));

    remove_dir(&state.config.upload_dir).await;
    Ok(())
}

#[tokio::test]
async fn non_image_upload_is_rejected_before_insert() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let admin = AuthUser {
        user_id: Uuid::new_v4(),
        role: ADMIN_ROLE.into(),
    };
    let name = format!("Notes {}", Uuid::new_v4());

    let err = catalog_service::create_item(
        &state,
        &admin,
        CatalogSource::Products,
        CreateCatalogItem {
            name: name.clone(),
            description: None,
            price: Decimal::ONE,
            image: Some(UploadedImage {
                file_name: "notes.txt".into(),
                content_type: Some("text/plain".into()),
                bytes: b"hello".to_vec(),
            }),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let listed = catalog_service::list_items(
        &state,
        CatalogSource::Products,
        CatalogQuery {
            q: Some(name),
            ..Default::default()
        },
    )
    .await?;
    assert!(listed.data.unwrap().items.is_empty());

    remove_dir(&state.config.upload_dir).await;
    Ok(())
}

async fn setup_state() -> anyhow::Result<Option<AppState>> {
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            return Ok(None);
        }
    };

    let pool = create_pool(&database_url).await?;
    run_migrations(&pool).await?;

    let config = AppConfig {
        database_url,
        host: "127.0.0.1".into(),
        port: 0,
        jwt_secret: "test-secret".into(),
        delivery_fee: Decimal::from_str("5.00")?,
        upload_dir: std::env::temp_dir().join(format!("uploads-{}", Uuid::new_v4())),
        public_base_url: PUBLIC_BASE_URL.into(),
        max_upload_bytes: 1024 * 1024,
    };
    Ok(Some(AppState::new(pool, config)))
}

async fn remove_dir(path: &Path) {
    let _ = tokio::fs::remove_dir_all(path).await;
}
