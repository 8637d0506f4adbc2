//! End-to-end issuance workflow over the in-memory adapters.

use std::sync::Arc;

use mcard_core::CredentialStatus;
use mcard_registry::{
    BlobStore, FsBlobStore, MemoryBlobStore, MemoryCredentialStore, PhotoUpload, Registration,
    Registry, RegistryError,
};

fn contains(haystack: &[u8], needle: &str) -> bool {
    haystack
        .windows(needle.len())
        .any(|w| w == needle.as_bytes())
}

fn page_text(pdf: &[u8]) -> String {
    lopdf::Document::load_mem(pdf).unwrap().extract_text(&[1]).unwrap()
}

fn jpeg_photo() -> Vec<u8> {
    let img = image::RgbImage::from_fn(30, 40, |x, y| image::Rgb([(x * 8) as u8, (y * 6) as u8, 60]));
    let mut out = std::io::Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Jpeg).unwrap();
    out.into_inner()
}

fn asha() -> Registration {
    Registration {
        name: "Asha Rao".into(),
        national_id: "1234-5678-9012".into(),
        phone: "9000000001".into(),
        address: "12 MG Road".into(),
        photo: None,
    }
}

fn memory_registry() -> (Registry, MemoryBlobStore) {
    let blobs = MemoryBlobStore::new();
    let registry = Registry::new(
        Arc::new(MemoryCredentialStore::new()),
        Arc::new(blobs.clone()),
    );
    (registry, blobs)
}

#[tokio::test]
async fn test_asha_rao_end_to_end() {
    let (registry, blobs) = memory_registry();

    let record = registry.register(asha()).await.unwrap();
    assert_eq!(record.status, CredentialStatus::Pending);
    assert!(!registry.check_availability("9000000001").await.unwrap());

    let approval = registry.approve(record.id).await.unwrap();
    assert_eq!(
        approval.certificate_ref,
        "licenses/generated/NEHRU_MLA_Asha_Rao.pdf"
    );
    assert!(approval
        .notification_link
        .starts_with("https://wa.me/919000000001?text="));
    assert!(approval.notification_link.contains("Asha%20Rao"));
    assert_eq!(approval.record.status, CredentialStatus::Approved);
    assert!(approval.record.is_consistent());

    let certificate = registry.retrieve("9000000001").await.unwrap();
    assert_eq!(certificate.filename, "NEHRU_MLA_Asha_Rao.pdf");
    assert!(certificate.bytes.starts_with(b"%PDF-"));
    let text = page_text(&certificate.bytes);
    assert!(text.contains("Asha Rao"));
    assert!(text.contains("12 MG Road"));
    assert!(text.contains("1234-5678-9012"));

    // The stored PDF and the re-rendered download agree.
    let stored = blobs.get(&approval.certificate_ref).await.unwrap();
    assert_eq!(stored, certificate.bytes);
}

#[tokio::test]
async fn test_retrieve_before_approval_is_not_found() {
    let (registry, _) = memory_registry();
    registry.register(asha()).await.unwrap();

    let pending = registry.retrieve("9000000001").await.unwrap_err();
    let unknown = registry.retrieve("9999999999").await.unwrap_err();
    assert!(matches!(pending, RegistryError::NotFound));
    assert!(matches!(unknown, RegistryError::NotFound));
    assert_eq!(pending.to_string(), unknown.to_string());
}

#[tokio::test]
async fn test_retrieve_requires_phone() {
    let (registry, _) = memory_registry();
    assert!(matches!(
        registry.retrieve(" ").await,
        Err(RegistryError::Validation(_))
    ));
}

#[tokio::test]
async fn test_repeated_approval_regenerates_in_place() {
    let (registry, blobs) = memory_registry();
    let record = registry.register(asha()).await.unwrap();

    let first = registry.approve(record.id).await.unwrap();
    let second = registry.approve(record.id).await.unwrap();

    assert_eq!(first.certificate_ref, second.certificate_ref);
    assert_eq!(first.notification_link, second.notification_link);
    assert_eq!(blobs.keys(), vec![first.certificate_ref.clone()]);
    assert!(second.record.approved_at >= first.record.approved_at);
}

#[tokio::test]
async fn test_namesakes_get_distinct_certificates() {
    let (registry, blobs) = memory_registry();
    let a = registry.register(asha()).await.unwrap();
    let b = registry
        .register(Registration {
            phone: "9000000002".into(),
            ..asha()
        })
        .await
        .unwrap();

    let first = registry.approve(a.id).await.unwrap();
    let second = registry.approve(b.id).await.unwrap();
    assert_eq!(first.certificate_ref, "licenses/generated/NEHRU_MLA_Asha_Rao.pdf");
    assert_eq!(second.certificate_ref, "licenses/generated/NEHRU_MLA_Asha_Rao_1.pdf");
    assert_eq!(blobs.keys().len(), 2);
}

#[tokio::test]
async fn test_delete_leaves_blobs_in_place() {
    let (registry, blobs) = memory_registry();
    let record = registry
        .register(Registration {
            photo: Some(PhotoUpload {
                filename: "asha.jpg".into(),
                bytes: jpeg_photo(),
            }),
            ..asha()
        })
        .await
        .unwrap();
    let approval = registry.approve(record.id).await.unwrap();
    let photo = record.photo_ref.clone().unwrap();

    registry.delete(record.id).await.unwrap();

    // Blob cleanup on delete is not guaranteed; today nothing is removed.
    assert!(blobs.get(&photo).await.is_ok());
    assert!(blobs.get(&approval.certificate_ref).await.is_ok());

    assert!(matches!(registry.approve(record.id).await, Err(RegistryError::NotFound)));
    assert!(matches!(registry.retrieve("9000000001").await, Err(RegistryError::NotFound)));
    assert!(registry.check_availability("9000000001").await.unwrap());
}

#[tokio::test]
async fn test_delete_unknown_is_not_found() {
    let (registry, _) = memory_registry();
    assert!(matches!(
        registry.delete(mcard_core::CredentialId::new()).await,
        Err(RegistryError::NotFound)
    ));
}

#[tokio::test]
async fn test_list_is_fresh_and_ordered() {
    let (registry, _) = memory_registry();
    assert!(registry.list().await.unwrap().is_empty());
    let a = registry.register(asha()).await.unwrap();
    let b = registry
        .register(Registration {
            name: "Ravi Kumar".into(),
            phone: "9000000002".into(),
            ..asha()
        })
        .await
        .unwrap();
    registry.approve(a.id).await.unwrap();

    let listed = registry.list().await.unwrap();
    assert_eq!(listed.iter().map(|r| r.id).collect::<Vec<_>>(), vec![a.id, b.id]);
    assert_eq!(listed[0].status, CredentialStatus::Approved);
    assert_eq!(listed[1].status, CredentialStatus::Pending);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_registration_yields_one_record() {
    let (registry, _) = memory_registry();
    let attempts = 32;

    let handles: Vec<_> = (0..attempts)
        .map(|_| {
            let registry = registry.clone();
            tokio::spawn(async move { registry.register(asha()).await })
        })
        .collect();

    let mut created = 0;
    let mut duplicates = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => created += 1,
            Err(RegistryError::DuplicatePhone) => duplicates += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(created, 1);
    assert_eq!(duplicates, attempts - 1);
    assert_eq!(registry.list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_filesystem_blob_store_workflow() {
    let media = tempfile::tempdir().unwrap();
    let registry = Registry::new(
        Arc::new(MemoryCredentialStore::new()),
        Arc::new(FsBlobStore::new(media.path())),
    );
    let record = registry
        .register(Registration {
            photo: Some(PhotoUpload {
                filename: "asha.jpg".into(),
                bytes: jpeg_photo(),
            }),
            ..asha()
        })
        .await
        .unwrap();
    assert_eq!(record.photo_ref.as_deref(), Some("licenses/photos/asha.jpg"));
    assert!(media.path().join("licenses/photos/asha.jpg").exists());

    registry.approve(record.id).await.unwrap();
    let on_disk =
        std::fs::read(media.path().join("licenses/generated/NEHRU_MLA_Asha_Rao.pdf")).unwrap();
    let doc = lopdf::Document::load_mem(&on_disk).unwrap();
    let page = doc.page_iter().next().unwrap();
    let images = doc.get_page_images(page).unwrap();
    assert_eq!(images.len(), 1);
    assert_eq!((images[0].width, images[0].height), (30, 40));
    assert!(!contains(&on_disk, "licenses/photos/"));
}
