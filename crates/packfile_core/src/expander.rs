//! Release matrix expansion.
//!
//! Every release is expanded once for every environment it applies to.
//! Environments form the outer loop and releases the inner one, so the
//! compiled actions are grouped by environment in declaration order.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use tracing::{debug, warn};

use packfile_runner::{ClusterTarget, ReleaseInvocation};
use packfile_spec::{EnvironmentOverride, ReleaseTemplate};
use packfile_templates::{EnvironmentStore, TemplateContext, TemplateResolver};

use crate::error::{CoreError, CoreResult};
use crate::pack::Pack;
use crate::registry::RegistryCatalog;

/// A release compiled for one environment, ready for nomad-pack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleaseAction {
    pub name: String,
    pub environment: String,
    pub pack: Pack,
    /// Var files that exist, relative to `work_dir`
    pub var_files: Vec<String>,
    pub vars: IndexMap<String, String>,
    pub work_dir: PathBuf,
    pub nomad_addr: String,
    #[serde(serialize_with = "redact")]
    pub nomad_token: String,
}

impl ReleaseAction {
    /// Cluster this release is deployed to.
    pub fn target(&self) -> ClusterTarget {
        ClusterTarget::new(&self.nomad_addr, &self.nomad_token)
    }

    /// Build the executor invocation for this release.
    pub fn invocation(&self) -> ReleaseInvocation {
        ReleaseInvocation {
            work_dir: self.work_dir.clone(),
            var_files: self.var_files.clone(),
            vars: self
                .vars
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            pack_args: self.pack.args(),
            target: self.target(),
        }
    }
}

fn redact<S: Serializer>(token: &str, serializer: S) -> Result<S::Ok, S::Error> {
    if token.is_empty() {
        serializer.serialize_str("")
    } else {
        serializer.serialize_str("<redacted>")
    }
}

/// Expands release templates across environments.
pub struct ReleaseExpander<'a> {
    catalog: &'a RegistryCatalog,
    work_dir: &'a Path,
    resolver: TemplateResolver,
}

impl<'a> ReleaseExpander<'a> {
    pub fn new(catalog: &'a RegistryCatalog, work_dir: &'a Path) -> Self {
        Self {
            catalog,
            work_dir,
            resolver: TemplateResolver::new(),
        }
    }

    /// Expand every (environment, release) pair into release actions.
    ///
    /// Environment files are loaded into `store` as releases are expanded,
    /// so later releases see variables loaded for earlier ones. The first
    /// error aborts the expansion.
    pub fn expand(
        &self,
        environments: &IndexMap<String, EnvironmentOverride>,
        releases: &[ReleaseTemplate],
        store: &mut EnvironmentStore,
    ) -> CoreResult<Vec<ReleaseAction>> {
        let mut actions = Vec::new();

        for (environment, overrides) in environments {
            for release in releases {
                if !release.applies_to(environment) {
                    debug!(
                        "Skipping release {} for environment {}: not in {:?}",
                        release.name, environment, release.environments
                    );
                    continue;
                }

                debug!("Expanding release {} for environment {}", release.name, environment);
                actions.push(self.expand_release(environment, overrides, release, store)?);
            }
        }

        Ok(actions)
    }

    fn expand_release(
        &self,
        environment: &str,
        overrides: &EnvironmentOverride,
        release: &ReleaseTemplate,
        store: &mut EnvironmentStore,
    ) -> CoreResult<ReleaseAction> {
        let nomad_addr = if overrides.nomad_addr.is_empty() {
            &release.nomad_addr
        } else {
            &overrides.nomad_addr
        };
        let nomad_token = if overrides.nomad_token.is_empty() {
            &release.nomad_token
        } else {
            &overrides.nomad_token
        };

        for env_file in &release.environment_files {
            store
                .load_file(self.work_dir.join(env_file))
                .map_err(|source| CoreError::EnvironmentFile {
                    release: release.name.clone(),
                    source,
                })?;
        }

        let context = store.context(environment);
        let pack = Pack::resolve(&release.name, &release.pack, self.catalog)?;

        let nomad_addr = self.render(release, "nomad-addr", nomad_addr, &context)?;
        let nomad_token = self.render(release, "nomad-token", nomad_token, &context)?;

        let mut var_files = Vec::with_capacity(release.var_files.len());
        for var_file in &release.var_files {
            let var_file = self.render(release, "var-files", var_file, &context)?;
            let path = self.work_dir.join(&var_file);
            if path.exists() {
                var_files.push(var_file);
            } else {
                warn!("Var file {} not found, skipping", path.display());
            }
        }

        let mut vars = IndexMap::with_capacity(release.vars.len());
        for (key, value) in &release.vars {
            let field = format!("vars.{}", key);
            vars.insert(key.clone(), self.render(release, &field, value, &context)?);
        }

        Ok(ReleaseAction {
            name: release.name.clone(),
            environment: environment.to_string(),
            pack,
            var_files,
            vars,
            work_dir: self.work_dir.to_path_buf(),
            nomad_addr,
            nomad_token,
        })
    }

    fn render(
        &self,
        release: &ReleaseTemplate,
        field: &str,
        template: &str,
        context: &TemplateContext,
    ) -> CoreResult<String> {
        self.resolver
            .resolve(template, context)
            .map_err(|source| CoreError::Template {
                release: release.name.clone(),
                field: field.to_string(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use packfile_spec::RegistryConfig;
    use std::fs;
    use tempfile::tempdir;

    fn environments(names: &[&str]) -> IndexMap<String, EnvironmentOverride> {
        names
            .iter()
            .map(|n| (n.to_string(), EnvironmentOverride::default()))
            .collect()
    }

    #[test]
    fn test_actions_grouped_by_environment() {
        let dir = tempdir().unwrap();
        let catalog = RegistryCatalog::new();
        let expander = ReleaseExpander::new(&catalog, dir.path());

        let releases = vec![
            ReleaseTemplate::new("web", "nginx"),
            ReleaseTemplate::new("api", "api"),
        ];
        let actions = expander
            .expand(
                &environments(&["staging", "production"]),
                &releases,
                &mut EnvironmentStore::new(),
            )
            .unwrap();

        let order: Vec<(&str, &str)> = actions
            .iter()
            .map(|a| (a.environment.as_str(), a.name.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![
                ("staging", "web"),
                ("staging", "api"),
                ("production", "web"),
                ("production", "api"),
            ]
        );
    }

    #[test]
    fn test_environment_selection() {
        let dir = tempdir().unwrap();
        let catalog = RegistryCatalog::new();
        let expander = ReleaseExpander::new(&catalog, dir.path());

        let releases = vec![
            ReleaseTemplate::new("only-prod", "a").environment("production"),
            ReleaseTemplate::new("everywhere", "b").environment("all"),
            ReleaseTemplate::new("unlisted", "c").environment("qa"),
        ];
        let actions = expander
            .expand(
                &environments(&["staging", "production"]),
                &releases,
                &mut EnvironmentStore::new(),
            )
            .unwrap();

        let staging: Vec<_> = actions
            .iter()
            .filter(|a| a.environment == "staging")
            .map(|a| a.name.as_str())
            .collect();
        let production: Vec<_> = actions
            .iter()
            .filter(|a| a.environment == "production")
            .map(|a| a.name.as_str())
            .collect();

        assert_eq!(staging, vec!["everywhere"]);
        assert_eq!(production, vec!["only-prod", "everywhere"]);
    }

    #[test]
    fn test_override_wins_and_is_templated() {
        let dir = tempdir().unwrap();
        let catalog = RegistryCatalog::new();
        let expander = ReleaseExpander::new(&catalog, dir.path());

        let mut envs = IndexMap::new();
        envs.insert(
            "staging".to_string(),
            EnvironmentOverride::new().nomad_addr("http://{{ .Environment.Name }}:4646"),
        );
        let releases = vec![ReleaseTemplate::new("web", "nginx")
            .nomad_addr("x")
            .nomad_token("{{ .Env.TOKEN }}")];

        let mut store: EnvironmentStore = [("TOKEN", "secret")].into_iter().collect();
        let actions = expander.expand(&envs, &releases, &mut store).unwrap();

        assert_eq!(actions[0].nomad_addr, "http://staging:4646");
        assert_eq!(actions[0].nomad_token, "secret");
    }

    #[test]
    fn test_var_files_are_templated_and_filtered() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("vars")).unwrap();
        fs::write(dir.path().join("vars/staging.hcl"), "replicas = 1").unwrap();

        let catalog = RegistryCatalog::new();
        let expander = ReleaseExpander::new(&catalog, dir.path());
        let releases = vec![ReleaseTemplate::new("web", "nginx")
            .var_file("vars/{{ .Environment.Name }}.hcl")
            .var_file("vars/missing.hcl")];

        let actions = expander
            .expand(&environments(&["staging"]), &releases, &mut EnvironmentStore::new())
            .unwrap();

        assert_eq!(actions[0].var_files, vec!["vars/staging.hcl"]);
    }

    #[test]
    fn test_vars_are_templated() {
        let dir = tempdir().unwrap();
        let catalog = RegistryCatalog::new();
        let expander = ReleaseExpander::new(&catalog, dir.path());
        let releases = vec![ReleaseTemplate::new("web", "nginx")
            .var("{{ .Environment.Name }}", "{{ .Environment.Name }}")
            .var("missing", "{{ .Env.NOT_SET }}")];

        let actions = expander
            .expand(&environments(&["staging"]), &releases, &mut EnvironmentStore::new())
            .unwrap();

        let vars = &actions[0].vars;
        assert_eq!(vars["{{ .Environment.Name }}"], "staging");
        assert_eq!(vars["missing"], "");
    }

    #[test]
    fn test_environment_files_are_visible_to_later_releases() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("shared.env"), "DATACENTER=dc1\n").unwrap();

        let catalog = RegistryCatalog::new();
        let expander = ReleaseExpander::new(&catalog, dir.path());
        let releases = vec![
            ReleaseTemplate::new("first", "a")
                .environment_file("shared.env")
                .var("dc", "{{ .Env.DATACENTER }}"),
            ReleaseTemplate::new("second", "b").var("dc", "{{ .Env.DATACENTER }}"),
        ];

        let mut store = EnvironmentStore::new();
        let actions = expander
            .expand(&environments(&["staging"]), &releases, &mut store)
            .unwrap();

        assert_eq!(actions[0].vars["dc"], "dc1");
        assert_eq!(actions[1].vars["dc"], "dc1");
        assert_eq!(store.get("DATACENTER"), Some("dc1"));
    }

    #[test]
    fn test_resolved_values_are_not_templated_again() {
        let dir = tempdir().unwrap();
        let literal = "{{ .Environment.Name }}";
        fs::write(dir.path().join(literal), "").unwrap();

        let catalog = RegistryCatalog::new();
        let expander = ReleaseExpander::new(&catalog, dir.path());
        let releases = vec![ReleaseTemplate::new("web", "nginx")
            .nomad_addr("{{ .Env.RAW }}")
            .nomad_token("{{ .Env.RAW }}")
            .var_file("{{ .Env.RAW }}")
            .var("raw", "{{ .Env.RAW }}")];

        let mut store: EnvironmentStore = [("RAW", literal)].into_iter().collect();
        let actions = expander
            .expand(&environments(&["staging"]), &releases, &mut store)
            .unwrap();

        let action = &actions[0];
        assert_eq!(action.nomad_addr, literal);
        assert_eq!(action.nomad_token, literal);
        assert_eq!(action.var_files, vec![literal]);
        assert_eq!(action.vars["raw"], literal);
    }

    #[test]
    fn test_missing_environment_file_is_fatal() {
        let dir = tempdir().unwrap();
        let catalog = RegistryCatalog::new();
        let expander = ReleaseExpander::new(&catalog, dir.path());
        let releases = vec![ReleaseTemplate::new("web", "nginx").environment_file("missing.env")];

        let result =
            expander.expand(&environments(&["staging"]), &releases, &mut EnvironmentStore::new());
        assert!(matches!(result, Err(CoreError::EnvironmentFile { .. })));
    }

    #[test]
    fn test_template_error_names_field() {
        let dir = tempdir().unwrap();
        let catalog = RegistryCatalog::new();
        let expander = ReleaseExpander::new(&catalog, dir.path());
        let releases = vec![ReleaseTemplate::new("web", "nginx").var("image", "{{ .Env.IMAGE")];

        match expander.expand(&environments(&["staging"]), &releases, &mut EnvironmentStore::new()) {
            Err(CoreError::Template { release, field, .. }) => {
                assert_eq!(release, "web");
                assert_eq!(field, "vars.image");
            }
            other => panic!("expected template error, got {:?}", other),
        }
    }

    #[test]
    fn test_registry_pack_resolution() {
        let dir = tempdir().unwrap();
        let catalog = RegistryCatalog::build(&[RegistryConfig::new("community", "github.com/x/y")]);
        let expander = ReleaseExpander::new(&catalog, dir.path());
        let releases = vec![ReleaseTemplate::new("web", "registry://community/web-pack")];

        let actions = expander
            .expand(&environments(&["staging"]), &releases, &mut EnvironmentStore::new())
            .unwrap();
        let invocation = actions[0].invocation();

        assert_eq!(invocation.pack_args, vec!["--registry", "community", "web-pack"]);
        assert_eq!(invocation.work_dir, dir.path());
    }

    #[test]
    fn test_token_is_redacted_when_serialized() {
        let action = ReleaseAction {
            name: "web".to_string(),
            environment: "staging".to_string(),
            pack: Pack::bare("nginx"),
            var_files: Vec::new(),
            vars: IndexMap::new(),
            work_dir: PathBuf::from("."),
            nomad_addr: "http://nomad:4646".to_string(),
            nomad_token: "secret".to_string(),
        };

        let yaml = serde_yaml::to_string(&action).unwrap();
        assert!(!yaml.contains("secret"));
        assert!(yaml.contains("<redacted>"));
    }
}
