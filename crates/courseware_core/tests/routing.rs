use courseware_core::{CacheGenerations, CachePolicy, RoutingRules, STATIC_CACHE_PREFIX};

#[test]
fn api_and_auth_paths_bypass_cache_regardless_of_extension() {
    let rules = RoutingRules::default();
    for url in [
        "https://lms.example/api/cursos",
        "https://lms.example/api/static/logo.png",
        "http://localhost:8080/modules/app.js",
        "https://lms.example/auth/refresh",
        "https://lms.example/login",
        "https://lms.example/admin/users",
        "https://lms.example/empleado/cursos",
        "https://lms.example/instructor/evaluaciones",
    ] {
        assert_eq!(rules.classify(url), CachePolicy::Bypass, "{url}");
    }
}

#[test]
fn backend_host_is_added_to_bypass_list() {
    let rules = RoutingRules::default().with_backend_host("backend.example.com");
    assert_eq!(
        rules.classify("https://backend.example.com/files/logo.png"),
        CachePolicy::Bypass
    );
    let again = rules.clone().with_backend_host("backend.example.com");
    assert_eq!(again.no_cache_patterns().len(), rules.no_cache_patterns().len());
}

#[test]
fn static_assets_are_cache_first() {
    let rules = RoutingRules::default();
    for url in [
        "https://lms.example/assets/index-3f2a.js",
        "https://lms.example/assets/site.CSS",
        "/img/banner.png?v=2",
        "/photo.jpg",
        "/icons/play.svg#frag",
        "/favicon.ico",
    ] {
        assert_eq!(rules.classify(url), CachePolicy::CacheFirst, "{url}");
    }
}

#[test]
fn documents_are_network_first() {
    let rules = RoutingRules::default();
    assert_eq!(rules.classify("https://lms.example/"), CachePolicy::NetworkFirst);
    assert_eq!(
        rules.classify("https://lms.example/cursos/3"),
        CachePolicy::NetworkFirst
    );
    assert_eq!(rules.classify("/manifest.json"), CachePolicy::NetworkFirst);
    assert_eq!(
        rules.classify("https://lms.example/page?file=a.js"),
        CachePolicy::NetworkFirst
    );
}

#[test]
fn stale_generations_exclude_only_current() {
    let generations = CacheGenerations::for_version("v2");
    assert_eq!(generations.current(), format!("{STATIC_CACHE_PREFIX}v2"));
    let existing = vec![
        format!("{STATIC_CACHE_PREFIX}v1"),
        generations.current().to_string(),
        "runtime".to_string(),
    ];
    assert_eq!(
        generations.stale(&existing),
        vec![format!("{STATIC_CACHE_PREFIX}v1"), "runtime".to_string()]
    );
}
