use std::cell::Cell;
use std::rc::Rc;

use ado_core::Result;
use ado_core::config::AdoSettings;
use ado_core::dependency::{
    Dependency, DependencyPin, DynamicDependency, ReleaseSelector, StaticDependency,
    get_static_dependencies,
};
use ado_core::error::VcsError;
use ado_core::host::memory::MemoryHost;
use ado_core::host::{GitStatusState, HostClient};
use ado_core::resolver::{
    Resolution, ResolutionContext, ResolutionEngine, ResolutionStrategy, Resolver,
    ResolverRegistry, strategies_for_preset,
};
use ado_core::service::{Connector, ServiceConfig, ServiceRegistry};

const URL: &str = "https://dev.azure.com/org/proj/_git/repo";
const SHA_A: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
const SHA_B: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";
const SHA_C: &str = "cccccccccccccccccccccccccccccccccccccccc";

#[derive(Debug)]
struct MemoryConnector {
    host: Rc<MemoryHost>,
}

impl Connector for MemoryConnector {
    fn connect(&self, _service: &ServiceConfig) -> Result<Rc<dyn HostClient>> {
        let client: Rc<dyn HostClient> = self.host.clone();
        Ok(client)
    }
}

fn context_for(host: &Rc<MemoryHost>) -> ResolutionContext {
    context_with_settings(host, AdoSettings::default())
}

fn context_with_settings(host: &Rc<MemoryHost>, settings: AdoSettings) -> ResolutionContext {
    let registry = ServiceRegistry::new(
        vec![ServiceConfig::new("main", "https://dev.azure.com/org")],
        Box::new(MemoryConnector { host: host.clone() }),
        settings,
    )
    .unwrap();
    ResolutionContext::new(Rc::new(registry), "local")
}

fn seeded_host() -> Rc<MemoryHost> {
    let host = Rc::new(MemoryHost::new());
    host.add_repository("proj", "repo", "main");
    host.add_commit(SHA_A, &[]);
    host.add_commit(SHA_B, &[SHA_A]);
    host.add_branch("main", SHA_B);
    host
}

/// Publish `tag` as a release of `repo` and tag `commit` with `message`.
fn publish_release(host: &Rc<MemoryHost>, tag: &str, commit: &str, message: &str, views: &[&str]) {
    let feed_id = match host.feeds().into_iter().find(|f| f.name == "repo") {
        Some(feed) => feed.id,
        None => host.add_feed(None, "repo").id,
    };
    let description = format!(r#"{{"tag_name":"{}","body":""}}"#, tag);
    host.add_package_version(&feed_id, "repo", tag, Some(&description), views);
    host.add_annotated_tag(tag, &format!("tag-{}", tag), commit, message);
}

#[derive(Debug)]
struct CountingResolver {
    label: &'static str,
    result: Option<&'static str>,
    calls: Rc<Cell<usize>>,
}

impl CountingResolver {
    fn new(label: &'static str, result: Option<&'static str>) -> (Self, Rc<Cell<usize>>) {
        let calls = Rc::new(Cell::new(0));
        (
            Self {
                label,
                result,
                calls: calls.clone(),
            },
            calls,
        )
    }
}

impl Resolver for CountingResolver {
    fn name(&self) -> &str {
        self.label
    }

    fn can_resolve(&self, _dependency: &DynamicDependency, _context: &ResolutionContext) -> bool {
        true
    }

    fn resolve(
        &self,
        _dependency: &DynamicDependency,
        _context: &ResolutionContext,
    ) -> Result<Resolution> {
        self.calls.set(self.calls.get() + 1);
        Ok(match self.result {
            Some(git_ref) => Resolution::at(git_ref, None),
            None => Resolution::miss(),
        })
    }
}

#[test]
fn engine_stops_at_first_hit() {
    let (first, first_calls) = CountingResolver::new("first", None);
    let (second, second_calls) = CountingResolver::new("second", Some("abc"));
    let (third, third_calls) = CountingResolver::new("third", Some("def"));
    let engine = ResolutionEngine::new(
        ResolverRegistry::new()
            .with(ResolutionStrategy::StaticTagReference, first)
            .with(ResolutionStrategy::ReleaseTag, second)
            .with(ResolutionStrategy::UnmanagedHead, third),
    );
    let host = seeded_host();
    let context = context_for(&host);
    let dependency = DynamicDependency::new(URL);

    let (strategy, resolution) = engine
        .try_resolve(&dependency, &context, &strategies_for_preset("production").unwrap())
        .unwrap()
        .unwrap();

    assert_eq!(strategy, ResolutionStrategy::ReleaseTag);
    assert_eq!(resolution.git_ref.as_deref(), Some("abc"));
    assert_eq!(first_calls.get(), 1);
    assert_eq!(second_calls.get(), 1);
    assert_eq!(third_calls.get(), 0);
}

#[test]
fn engine_skips_unregistered_strategies() {
    let (only, calls) = CountingResolver::new("only", Some("abc"));
    let engine = ResolutionEngine::new(
        ResolverRegistry::new().with(ResolutionStrategy::UnmanagedHead, only),
    );
    let host = seeded_host();
    let context = context_for(&host);

    let resolution = engine
        .resolve(
            &DynamicDependency::new(URL),
            &context,
            &[ResolutionStrategy::BetaReleaseTag, ResolutionStrategy::UnmanagedHead],
        )
        .unwrap();

    assert_eq!(resolution.git_ref.as_deref(), Some("abc"));
    assert_eq!(calls.get(), 1);
}

#[test]
fn exhausted_strategies_are_a_resolution_error() {
    let (miss, _) = CountingResolver::new("miss", None);
    let engine = ResolutionEngine::new(
        ResolverRegistry::new().with(ResolutionStrategy::ReleaseTag, miss),
    );
    let host = seeded_host();
    let context = context_for(&host);
    let dependency = DynamicDependency::new(URL);

    assert!(
        engine
            .try_resolve(&dependency, &context, &[ResolutionStrategy::ReleaseTag])
            .unwrap()
            .is_none()
    );
    let err = engine
        .resolve(&dependency, &context, &[ResolutionStrategy::ReleaseTag])
        .unwrap_err();
    assert!(matches!(err, VcsError::Resolution(ref m) if m.starts_with("Unable to resolve dependency")));
}

#[test]
fn tag_strategy_builds_version_id_dependency() {
    let host = seeded_host();
    publish_release(
        &host,
        "1.0.0",
        SHA_A,
        "Release\n\nversion_id: 04t000000000001\npackage_type: 2GP",
        &["Release"],
    );
    let context = context_for(&host);
    let engine = ResolutionEngine::new(ResolverRegistry::with_default_resolvers());
    let mut dependency = DynamicDependency::new(URL).with_tag("1.0.0");

    dependency
        .resolve(&engine, &context, &strategies_for_preset("production").unwrap())
        .unwrap();

    assert_eq!(dependency.git_ref.as_deref(), Some(SHA_A));
    match dependency.package_dependency {
        Some(StaticDependency::PackageVersionId(ref package)) => {
            assert_eq!(package.version_id, "04t000000000001");
            assert_eq!(package.version_number.as_deref(), Some("1.0.0"));
            assert_eq!(package.package_name.as_deref(), Some("repo"));
        }
        ref other => panic!("unexpected package dependency: {:?}", other),
    }
}

#[test]
fn tag_without_release_is_an_error() {
    let host = seeded_host();
    let context = context_for(&host);
    let engine = ResolutionEngine::new(ResolverRegistry::with_default_resolvers());
    let mut dependency = DynamicDependency::new(URL).with_tag("3.0.0");

    let err = dependency
        .resolve(&engine, &context, &strategies_for_preset("production").unwrap())
        .unwrap_err();

    assert!(matches!(err, VcsError::Resolution(ref m) if m == "No release found for tag 3.0.0"));
}

#[test]
fn first_gen_release_with_namespace_uses_namespace_version() {
    let host = seeded_host();
    publish_release(
        &host,
        "1.2.0",
        SHA_A,
        "Release\n\npackage_type: 1GP",
        &["Release"],
    );
    host.add_file(SHA_A, "cumulusci.toml", "[project.package]\nnamespace = \"wdg\"\n");
    let context = context_for(&host);
    let engine = ResolutionEngine::new(ResolverRegistry::with_default_resolvers());
    let mut dependency = DynamicDependency::new(URL);

    dependency
        .resolve(&engine, &context, &strategies_for_preset("production").unwrap())
        .unwrap();

    match dependency.package_dependency {
        Some(StaticDependency::PackageNamespaceVersion(ref package)) => {
            assert_eq!(package.namespace, "wdg");
            assert_eq!(package.version, "1.2.0");
        }
        ref other => panic!("unexpected package dependency: {:?}", other),
    }
}

#[test]
fn beta_strategy_prefers_prerelease() {
    let host = seeded_host();
    publish_release(&host, "1.0.0", SHA_A, "version_id: 04t1", &["Release"]);
    publish_release(&host, "1.1.0", SHA_B, "version_id: 04t2", &["Prerelease"]);
    let context = context_for(&host);
    let engine = ResolutionEngine::new(ResolverRegistry::with_default_resolvers());

    let mut beta = DynamicDependency::new(URL);
    beta.release = Some(ReleaseSelector::LatestBeta);
    beta.resolve(&engine, &context, &[]).unwrap();
    assert_eq!(beta.git_ref.as_deref(), Some(SHA_B));

    let mut production = DynamicDependency::new(URL);
    production
        .resolve(&engine, &context, &strategies_for_preset("production").unwrap())
        .unwrap();
    assert_eq!(production.git_ref.as_deref(), Some(SHA_A));
}

#[test]
fn no_release_falls_back_to_unmanaged_head() {
    let host = seeded_host();
    let context = context_for(&host);
    let engine = ResolutionEngine::new(ResolverRegistry::with_default_resolvers());
    let mut dependency = DynamicDependency::new(URL);

    dependency
        .resolve(&engine, &context, &strategies_for_preset("production").unwrap())
        .unwrap();

    assert_eq!(dependency.git_ref.as_deref(), Some(SHA_B));
    assert!(dependency.package_dependency.is_none());
}

#[test]
fn commit_status_resolver_walks_feature_branch() {
    let host = seeded_host();
    host.add_commit(SHA_C, &[SHA_B]);
    host.add_branch("feature/login", SHA_C);
    host.add_status(
        SHA_B,
        "Build Feature Test Package",
        GitStatusState::Succeeded,
        "Build complete version_id: 04t000000000042",
    );
    host.add_status(
        SHA_C,
        "Build Feature Test Package",
        GitStatusState::Failed,
        "version_id: 04t000000000099",
    );
    let context = context_for(&host).with_branch("feature/login", "feature/");
    let engine = ResolutionEngine::new(ResolverRegistry::with_default_resolvers());
    let mut dependency = DynamicDependency::new(URL);

    dependency
        .resolve(&engine, &context, &strategies_for_preset("commit_status").unwrap())
        .unwrap();

    assert_eq!(dependency.git_ref.as_deref(), Some(SHA_B));
    match dependency.package_dependency {
        Some(StaticDependency::PackageVersionId(ref package)) => {
            assert_eq!(package.version_id, "04t000000000042");
        }
        ref other => panic!("unexpected package dependency: {:?}", other),
    }
}

#[test]
fn commit_status_resolver_honors_custom_context() {
    let host = seeded_host();
    host.add_file(
        "main",
        "cumulusci.toml",
        "[project.git]\nprefix_feature = \"work/\"\n\n[project.git.commit_status_context]\n2gp_context = \"Nightly Package\"\n",
    );
    host.add_branch("work/230", SHA_B);
    host.add_status(SHA_B, "Nightly Package", GitStatusState::Succeeded, "version_id: 04t7");
    let context = context_for(&host).with_branch("feature/230", "feature/");
    let engine = ResolutionEngine::new(ResolverRegistry::with_default_resolvers());
    let dependency = DynamicDependency::new(URL);

    let (strategy, resolution) = engine
        .try_resolve(&dependency, &context, &strategies_for_preset("commit_status").unwrap())
        .unwrap()
        .unwrap();

    assert_eq!(strategy, ResolutionStrategy::CommitStatusExactBranch);
    assert_eq!(resolution.git_ref.as_deref(), Some(SHA_B));
}

#[test]
fn commit_status_needs_a_local_branch() {
    let host = seeded_host();
    host.add_status(
        SHA_B,
        "Build Feature Test Package",
        GitStatusState::Succeeded,
        "version_id: 04t1",
    );
    let context = context_for(&host);
    let engine = ResolutionEngine::new(ResolverRegistry::with_default_resolvers());

    let (strategy, _) = engine
        .try_resolve(
            &DynamicDependency::new(URL),
            &context,
            &strategies_for_preset("commit_status").unwrap(),
        )
        .unwrap()
        .unwrap();

    assert_eq!(strategy, ResolutionStrategy::UnmanagedHead);
}

#[test]
fn child_branch_falls_back_to_previous_release_branch() {
    let host = seeded_host();
    host.add_commit(SHA_C, &[SHA_B]);
    host.add_branch("feature/229", SHA_C);
    host.add_status(
        SHA_C,
        "Build Feature Test Package",
        GitStatusState::Succeeded,
        "version_id: 04t229",
    );
    let context = context_for(&host).with_branch("feature/230__child", "feature/");
    let engine = ResolutionEngine::new(ResolverRegistry::with_default_resolvers());

    let (strategy, resolution) = engine
        .try_resolve(
            &DynamicDependency::new(URL),
            &context,
            &strategies_for_preset("commit_status").unwrap(),
        )
        .unwrap()
        .unwrap();

    assert_eq!(strategy, ResolutionStrategy::CommitStatusPreviousReleaseBranch);
    assert_eq!(resolution.git_ref.as_deref(), Some(SHA_C));
}

#[test]
fn child_branch_prefers_its_release_branch() {
    let host = seeded_host();
    host.add_commit(SHA_C, &[SHA_B]);
    host.add_branch("feature/230", SHA_C);
    host.add_branch("feature/229", SHA_B);
    host.add_status(
        SHA_B,
        "Build Feature Test Package",
        GitStatusState::Succeeded,
        "version_id: 04t229",
    );
    host.add_status(
        SHA_C,
        "Build Feature Test Package",
        GitStatusState::Succeeded,
        "version_id: 04t230",
    );
    let context = context_for(&host).with_branch("feature/230__child", "feature/");
    let engine = ResolutionEngine::new(ResolverRegistry::with_default_resolvers());

    let (strategy, resolution) = engine
        .try_resolve(
            &DynamicDependency::new(URL),
            &context,
            &strategies_for_preset("commit_status").unwrap(),
        )
        .unwrap()
        .unwrap();

    assert_eq!(strategy, ResolutionStrategy::CommitStatusReleaseBranch);
    assert_eq!(resolution.git_ref.as_deref(), Some(SHA_C));
    match resolution.package_dependency {
        Some(StaticDependency::PackageVersionId(ref package)) => {
            assert_eq!(package.version_id, "04t230");
        }
        ref other => panic!("unexpected package dependency: {:?}", other),
    }
}

#[test]
fn unlocked_default_branch_ignores_second_gen_status() {
    let host = seeded_host();
    host.add_status(
        SHA_B,
        "Build Feature Test Package",
        GitStatusState::Succeeded,
        "version_id: 04t2GP",
    );
    host.add_status(
        SHA_A,
        "Build Unlocked Test Package",
        GitStatusState::Succeeded,
        "version_id: 04tUNL",
    );
    let context = context_for(&host).with_branch("feature/login", "feature/");
    let engine = ResolutionEngine::new(ResolverRegistry::with_default_resolvers());

    let (strategy, resolution) = engine
        .try_resolve(
            &DynamicDependency::new(URL),
            &context,
            &strategies_for_preset("unlocked").unwrap(),
        )
        .unwrap()
        .unwrap();

    assert_eq!(strategy, ResolutionStrategy::UnlockedDefaultBranch);
    assert_eq!(resolution.git_ref.as_deref(), Some(SHA_A));
    match resolution.package_dependency {
        Some(StaticDependency::PackageVersionId(ref package)) => {
            assert_eq!(package.version_id, "04tUNL");
        }
        ref other => panic!("unexpected package dependency: {:?}", other),
    }
}

#[test]
fn missing_default_branch_is_a_miss() {
    let host = Rc::new(MemoryHost::new());
    host.add_repository("proj", "repo", "main");
    let context = context_for(&host).with_branch("feature/login", "feature/");
    let engine = ResolutionEngine::new(ResolverRegistry::with_default_resolvers());

    let resolved = engine
        .try_resolve(
            &DynamicDependency::new(URL),
            &context,
            &[ResolutionStrategy::CommitStatusDefaultBranch],
        )
        .unwrap();

    assert!(resolved.is_none());
}

#[test]
fn branch_prefix_setting_locates_remote_feature_branch() {
    let host = seeded_host();
    host.add_commit(SHA_C, &[SHA_B]);
    host.add_branch("work/login", SHA_C);
    host.add_status(
        SHA_C,
        "Build Feature Test Package",
        GitStatusState::Succeeded,
        "version_id: 04t7",
    );
    let engine = ResolutionEngine::new(ResolverRegistry::with_default_resolvers());
    let strategies = strategies_for_preset("commit_status").unwrap();

    let settings = AdoSettings {
        branch_prefix: "work/".to_string(),
        ..AdoSettings::default()
    };
    let context =
        context_with_settings(&host, settings).with_branch("feature/login", "feature/");
    let (strategy, resolution) = engine
        .try_resolve(&DynamicDependency::new(URL), &context, &strategies)
        .unwrap()
        .unwrap();
    assert_eq!(strategy, ResolutionStrategy::CommitStatusExactBranch);
    assert_eq!(resolution.git_ref.as_deref(), Some(SHA_C));

    let default_context = context_for(&host).with_branch("feature/login", "feature/");
    let (strategy, _) = engine
        .try_resolve(&DynamicDependency::new(URL), &default_context, &strategies)
        .unwrap()
        .unwrap();
    assert_eq!(strategy, ResolutionStrategy::UnmanagedHead);
}

#[test]
fn flatten_orders_pre_package_post() {
    let host = seeded_host();
    host.add_file(SHA_A, "cumulusci.toml", "[project.package]\nnamespace = \"wdg\"\n");
    host.add_file(SHA_A, "unpackaged/pre/first/package.xml", "");
    host.add_file(SHA_A, "unpackaged/pre/skipped/package.xml", "");
    host.add_file(SHA_A, "unpackaged/post/config/package.xml", "");
    host.add_file(SHA_A, "unpackaged/post/notes.md", "");
    publish_release(
        &host,
        "1.0.0",
        SHA_A,
        "version_id: 04t000000000001\npackage_type: 1GP",
        &["Release"],
    );
    let context = context_for(&host);
    let engine = ResolutionEngine::new(ResolverRegistry::with_default_resolvers());
    let mut dependency = DynamicDependency::new(URL).with_skip("unpackaged/pre/skipped");

    dependency
        .resolve(&engine, &context, &strategies_for_preset("production").unwrap())
        .unwrap();
    let flattened = dependency.flatten(&context).unwrap();

    assert_eq!(flattened.len(), 3);
    let Dependency::Static(StaticDependency::Unmanaged(pre)) = &flattened[0] else {
        panic!("expected unmanaged pre dependency: {:?}", flattened[0]);
    };
    assert_eq!(pre.subfolder.as_deref(), Some("unpackaged/pre/first"));
    assert!(pre.unmanaged);
    assert_eq!(pre.namespace_inject, None);

    assert!(matches!(
        flattened[1],
        Dependency::Static(StaticDependency::PackageNamespaceVersion(_))
    ));

    let Dependency::Static(StaticDependency::Unmanaged(post)) = &flattened[2] else {
        panic!("expected unmanaged post dependency: {:?}", flattened[2]);
    };
    assert_eq!(post.subfolder.as_deref(), Some("unpackaged/post/config"));
    assert!(!post.unmanaged);
    assert_eq!(post.namespace_inject.as_deref(), Some("wdg"));
    assert_eq!(post.namespace_strip, None);
}

#[test]
fn unmanaged_flatten_strips_namespace_from_post() {
    let host = seeded_host();
    host.add_file(SHA_B, "cumulusci.toml", "[project.package]\nnamespace = \"wdg\"\n");
    host.add_file(SHA_B, "unpackaged/post/config/package.xml", "");
    let context = context_for(&host);
    let dependency = DynamicDependency::new(URL)
        .with_ref(SHA_B)
        .with_unmanaged(true);

    let flattened = dependency.flatten(&context).unwrap();

    assert_eq!(flattened.len(), 2);
    let Dependency::Static(StaticDependency::Unmanaged(whole)) = &flattened[0] else {
        panic!("expected unmanaged repository: {:?}", flattened[0]);
    };
    assert_eq!(whole.subfolder, None);
    assert_eq!(whole.git_ref, SHA_B);

    let Dependency::Static(StaticDependency::Unmanaged(post)) = &flattened[1] else {
        panic!("expected unmanaged post dependency: {:?}", flattened[1]);
    };
    assert!(post.unmanaged);
    assert_eq!(post.namespace_strip.as_deref(), Some("wdg"));
}

#[test]
fn managed_dependency_without_release_cannot_flatten() {
    let host = seeded_host();
    host.add_file(SHA_B, "cumulusci.toml", "[project.package]\nnamespace = \"wdg\"\n");
    let context = context_for(&host);
    let dependency = DynamicDependency::new(URL).with_ref(SHA_B);

    let err = dependency.flatten(&context).unwrap_err();
    assert!(matches!(err, VcsError::Resolution(ref m) if m.starts_with("Could not find latest release for")));
}

#[test]
fn unresolved_dependency_cannot_flatten() {
    let host = seeded_host();
    let context = context_for(&host);

    let err = DynamicDependency::new(URL).flatten(&context).unwrap_err();
    assert!(matches!(err, VcsError::Resolution(_)));
}

#[test]
fn subfolder_dependency_flattens_to_itself() {
    let host = seeded_host();
    let context = context_for(&host);
    let dependency = DynamicDependency::new(URL)
        .with_ref(SHA_B)
        .with_subfolder("unpackaged/config/qa");

    let flattened = dependency.flatten(&context).unwrap();

    assert_eq!(flattened.len(), 1);
    let Dependency::Static(StaticDependency::Unmanaged(dep)) = &flattened[0] else {
        panic!("expected unmanaged subfolder: {:?}", flattened[0]);
    };
    assert_eq!(dep.subfolder.as_deref(), Some("unpackaged/config/qa"));
    assert!(dep.unmanaged);
    assert_eq!(host.calls("get_item_content"), 0);
}

#[test]
fn static_dependencies_expand_transitively_and_dedupe() {
    let host = seeded_host();
    host.add_repository("proj", "base", "main");
    host.add_file(
        SHA_B,
        "cumulusci.toml",
        "[[project.dependencies]]\nurl = \"https://dev.azure.com/org/proj/_git/base\"\nref = \"aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa\"\n\n[[project.dependencies]]\nversion_id = \"04t000000000005\"\n",
    );
    let context = context_for(&host);
    let engine = ResolutionEngine::new(ResolverRegistry::with_default_resolvers());
    let base_url = "https://dev.azure.com/org/proj/_git/base";

    let dependencies = vec![
        Dependency::Dynamic(DynamicDependency::new(URL).with_ref(SHA_B)),
        Dependency::Dynamic(DynamicDependency::new(base_url).with_ref(SHA_A)),
    ];
    let resolved = get_static_dependencies(
        dependencies,
        &[],
        &strategies_for_preset("production").unwrap(),
        &engine,
        &context,
    )
    .unwrap();

    let descriptions: Vec<String> = resolved.iter().map(|d| d.description()).collect();
    assert_eq!(
        descriptions,
        vec![
            format!("{} @{}", base_url, SHA_A),
            "04t000000000005".to_string(),
            format!("{} @{}", URL, SHA_B),
        ]
    );
}

#[test]
fn pins_force_tag_resolution() {
    let host = seeded_host();
    publish_release(&host, "1.0.0", SHA_A, "version_id: 04t1", &["Release"]);
    publish_release(&host, "2.0.0", SHA_B, "version_id: 04t2", &["Release"]);
    let context = context_for(&host);
    let engine = ResolutionEngine::new(ResolverRegistry::with_default_resolvers());
    let pins = vec![DependencyPin {
        url: URL.to_string(),
        tag: "1.0.0".to_string(),
    }];

    let resolved = get_static_dependencies(
        vec![Dependency::Dynamic(DynamicDependency::new(URL))],
        &pins,
        &strategies_for_preset("production").unwrap(),
        &engine,
        &context,
    )
    .unwrap();

    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0].description(), "04t1");
}

#[test]
fn conflicting_pin_is_rejected() {
    let host = seeded_host();
    let context = context_for(&host);
    let engine = ResolutionEngine::new(ResolverRegistry::with_default_resolvers());
    let pins = vec![DependencyPin {
        url: URL.to_string(),
        tag: "1.0.0".to_string(),
    }];

    let err = get_static_dependencies(
        vec![Dependency::Dynamic(DynamicDependency::new(URL).with_tag("2.0.0"))],
        &pins,
        &strategies_for_preset("production").unwrap(),
        &engine,
        &context,
    )
    .unwrap_err();

    assert!(matches!(err, VcsError::Resolution(_)));
}
