use crate::error::HarvestError;
use crate::SearchJob;

pub const DEFAULT_TEMPLATE_MAX_PAGE: u32 = 5;

pub type MakeSearchJob = fn(query_prefix: &str) -> SearchJob;

#[derive(Debug, Clone, Copy)]
pub struct SearchTemplate {
    pub name: &'static str,
    pub description: &'static str,
    pub make: MakeSearchJob,
}

macro_rules! template {
    ($name:literal, $description:literal, $fn_name:ident, $selector:literal $(,)?) => {{
        fn $fn_name(query_prefix: &str) -> SearchJob {
            prefixed($selector, query_prefix)
        }
        SearchTemplate {
            name: $name,
            description: $description,
            make: $fn_name,
        }
    }};
}

fn prefixed(selector: &str, query_prefix: &str) -> SearchJob {
    let prefix = query_prefix.trim();
    let query = if prefix.is_empty() {
        selector.to_string()
    } else {
        format!("{prefix} {selector}")
    };
    SearchJob::new(query, DEFAULT_TEMPLATE_MAX_PAGE)
}

static TEMPLATES: [SearchTemplate; 10] = [
    template!(
        "bazel-package",
        "Bazel BUILD files",
        bazel_package,
        r"path:/(^|\/)BUILD(\.bazel)?$/",
    ),
    template!(
        "buf-configuration",
        "buf.yaml module configs",
        buf_configuration,
        "path:**/buf.yaml",
    ),
    template!(
        "cargo-configuration",
        "Cargo manifests",
        cargo_configuration,
        "path:**/Cargo.toml",
    ),
    template!(
        "container-configuration",
        "Dockerfiles",
        container_configuration,
        "path:**/Dockerfile",
    ),
    template!(
        "go-modules",
        "Go module files",
        go_modules,
        "path:**/go.mod",
    ),
    template!(
        "poetry-configuration",
        "Poetry pyproject files",
        poetry_configuration,
        r#"path:**/pyproject.toml "[tool.poetry]""#,
    ),
    template!(
        "protobuf-definition",
        "Protocol buffer definitions",
        protobuf_definition,
        "path:**.proto",
    ),
    template!(
        "skaffold-configuration",
        "Skaffold pipelines",
        skaffold_configuration,
        "path:**/skaffold.yaml",
    ),
    template!(
        "terraform-backend",
        "Terraform backend blocks",
        terraform_backend,
        r#"path:**.tf /backend\s+"/"#,
    ),
    template!(
        "terraform-gke-cluster",
        "Terraform GKE clusters",
        terraform_gke_cluster,
        r#"path:**.tf "google_container_cluster""#,
    ),
];

pub fn templates() -> &'static [SearchTemplate] {
    &TEMPLATES
}

pub fn find_template(name: &str) -> Option<&'static SearchTemplate> {
    TEMPLATES.iter().find(|template| template.name == name)
}

pub fn make_search_job(name: &str, query_prefix: &str) -> Result<SearchJob, HarvestError> {
    find_template(name)
        .map(|template| (template.make)(query_prefix))
        .ok_or_else(|| HarvestError::UnknownTemplate(name.to_string()))
}
