use super::*;

fn active_cache(dir: &tempfile::TempDir) -> OfflineCache {
    let cache = OfflineCache::new();
    cache.set_cache_directory(dir.path()).expect("directory");
    cache.set_active(true).expect("activate");
    cache
}

#[test]
fn activation_needs_directory() {
    let cache = OfflineCache::new();
    assert!(matches!(cache.set_active(true), Err(CacheError::InvalidArgument(_))));
    assert!(!cache.is_active());
    assert!(cache.set_active(false).is_ok());
}

#[test]
fn directory_must_exist_and_be_a_directory() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cache = OfflineCache::new();
    assert!(matches!(
        cache.set_cache_directory(dir.path().join("missing")),
        Err(CacheError::InvalidArgument(_))
    ));

    let file = dir.path().join("plain.txt");
    std::fs::write(&file, b"x").expect("write");
    assert!(matches!(cache.set_cache_directory(&file), Err(CacheError::InvalidArgument(_))));
    assert!(cache.cache_directory().is_none());

    cache.set_cache_directory(dir.path()).expect("directory");
    assert_eq!(cache.cache_directory().as_deref(), Some(dir.path()));
}

#[test]
fn write_check_leaves_no_trace() {
    let dir = tempfile::tempdir().expect("tempdir");
    OfflineCache::new().set_cache_directory(dir.path()).expect("directory");
    assert_eq!(std::fs::read_dir(dir.path()).expect("read_dir").count(), 0);
}

#[cfg(unix)]
#[test]
fn unwritable_directory_is_rejected() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().expect("tempdir");
    let locked = dir.path().join("locked");
    std::fs::create_dir(&locked).expect("mkdir");
    std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o555)).expect("chmod");

    // Privileged users write through permission bits; nothing to assert then.
    let can_write = std::fs::write(locked.join("x"), b"x").is_ok();
    let cache = OfflineCache::new();
    let result = cache.set_cache_directory(&locked);
    if can_write {
        assert!(result.is_ok());
    } else {
        assert!(matches!(result, Err(CacheError::InvalidArgument(_))));
        assert!(cache.cache_directory().is_none());
    }
    std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).expect("chmod");
}

#[test]
fn filename_is_form_encoded_url() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cache = active_cache(&dir);
    let path = cache.filename_for_url("https://tile.example/a b/1.png?x=*~").expect("path");
    assert_eq!(path, dir.path().join("https%3A%2F%2Ftile.example%2Fa+b%2F1.png%3Fx%3D*%7E"));
}

#[test]
fn filename_is_pure_and_distinct() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cache = active_cache(&dir);
    let a = "https://a.tile.openstreetmap.org/12/2138/1404.png";
    let b = "https://a.tile.openstreetmap.org/12/2138/1405.png";
    assert_eq!(cache.filename_for_url(a).expect("a"), cache.filename_for_url(a).expect("a"));
    assert_ne!(cache.filename_for_url(a).expect("a"), cache.filename_for_url(b).expect("b"));
    assert_ne!(
        cache.filename_for_url("http://x/").expect("slash"),
        cache.filename_for_url("http://x").expect("bare")
    );
}

#[test]
fn filename_needs_directory() {
    let cache = OfflineCache::new();
    assert!(matches!(cache.filename_for_url("http://x/"), Err(CacheError::NoDirectory)));
    assert!(!cache.is_cached("http://x/"));
}

#[test]
fn filters_match_whole_url() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cache = active_cache(&dir);
    cache.set_no_cache_filters([r".*\.json", "http://live/.*"]).expect("filters");

    assert!(!cache.should_cache("http://tiles/style.json"));
    assert!(!cache.should_cache("http://live/1/2/3.png"));
    assert!(cache.should_cache("http://tiles/style.json.png"));
    assert!(cache.should_cache("https://other/http://live/"));
    assert_eq!(cache.no_cache_filters(), vec![r".*\.json".to_owned(), "http://live/.*".to_owned()]);
}

#[test]
fn invalid_filter_keeps_previous_filters() {
    let cache = OfflineCache::new();
    cache.set_no_cache_filters(["keep"]).expect("filters");
    let err = cache.set_no_cache_filters(["ok", "(unclosed"]).expect_err("invalid");
    assert!(matches!(err, CacheError::InvalidPattern { ref pattern, .. } if pattern == "(unclosed"));
    assert_eq!(cache.no_cache_filters(), vec!["keep".to_owned()]);
}

#[test]
fn inactive_cache_caches_nothing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cache = active_cache(&dir);
    cache.set_active(false).expect("deactivate");
    assert!(!cache.should_cache("http://tiles/1.png"));
}

#[test]
fn is_cached_needs_body_and_sidecar() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cache = active_cache(&dir);
    let url = "http://tiles/1/1/1.png";
    let file = cache.filename_for_url(url).expect("path");

    std::fs::write(&file, b"").expect("write");
    std::fs::write(sidecar_path(&file), b"{}").expect("write");
    assert!(!cache.is_cached(url));

    std::fs::write(&file, b"png").expect("write");
    assert!(cache.is_cached(url));

    std::fs::write(sidecar_path(&file), b"not json").expect("write");
    assert!(!cache.is_cached(url));
}

#[test]
fn data_info_uses_camel_case() {
    let info = DataInfo { content_type: Some("image/png".into()), ..DataInfo::default() };
    let json = serde_json::to_value(&info).expect("json");
    assert_eq!(json["contentType"], "image/png");
    assert!(json["contentEncoding"].is_null());
}

#[tokio::test]
async fn clear_empties_directory_but_keeps_it() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cache = active_cache(&dir);
    std::fs::write(dir.path().join("a"), b"1").expect("write");
    std::fs::write(dir.path().join("a.dataInfo"), b"{}").expect("write");
    std::fs::create_dir(dir.path().join("nested")).expect("mkdir");
    std::fs::write(dir.path().join("nested").join("b"), b"2").expect("write");

    assert_eq!(cache.clear().await.expect("clear"), 3);
    assert!(dir.path().is_dir());
    assert_eq!(std::fs::read_dir(dir.path()).expect("read_dir").count(), 0);
}

#[tokio::test]
async fn clear_needs_directory() {
    assert!(matches!(OfflineCache::new().clear().await, Err(CacheError::NoDirectory)));
}
