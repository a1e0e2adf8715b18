//! Kubernetes client for kndu

use std::path::{Path, PathBuf};

use kube::config::{KubeConfigOptions, Kubeconfig, KubeconfigError};

/// Where to load cluster credentials from
#[derive(Clone, Debug, Default)]
pub struct ConnectOptions {
    /// Explicit kubeconfig path; falls back to `$KUBECONFIG` or `~/.kube/config`
    pub kubeconfig: Option<PathBuf>,
    /// Context to use instead of the kubeconfig's current context
    pub context: Option<String>,
}

/// Errors raised while loading credentials, before any API request is made
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("kubeconfig not found at {}", .0.display())]
    KubeconfigNotFound(PathBuf),

    #[error("failed to read kubeconfig at {}", .path.display())]
    InvalidKubeconfig {
        path: PathBuf,
        #[source]
        source: KubeconfigError,
    },

    #[error("failed to read kubeconfig. Is kubectl configured?")]
    NoKubeconfig(#[source] KubeconfigError),

    #[error("context '{0}' not found in kubeconfig")]
    ContextNotFound(String),

    #[error("failed to create config for context: {context}")]
    Context {
        context: String,
        #[source]
        source: KubeconfigError,
    },

    #[error("failed to create kubernetes client")]
    Client(#[source] kube::Error),
}

/// Kubernetes client wrapper
pub struct KubeClient {
    pub(crate) client: kube::Client,
    context: Option<String>,
    default_namespace: Option<String>,
}

impl std::fmt::Debug for KubeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeClient")
            .field("context", &self.context)
            .field("default_namespace", &self.default_namespace)
            .finish_non_exhaustive()
    }
}

impl KubeClient {
    /// Load the kubeconfig and build a client for the selected context.
    ///
    /// No request is sent to the cluster here; an unreachable API server only
    /// shows up on the first fetch.
    pub async fn connect(options: &ConnectOptions) -> Result<Self, ConfigError> {
        let kubeconfig = load_kubeconfig(options.kubeconfig.as_deref())?;

        let context = options
            .context
            .clone()
            .or_else(|| kubeconfig.current_context.clone());
        let default_namespace = context_namespace(&kubeconfig, context.as_deref())?;

        let config = kube::Config::from_custom_kubeconfig(
            kubeconfig,
            &KubeConfigOptions {
                context: context.clone(),
                ..Default::default()
            },
        )
        .await
        .map_err(|source| ConfigError::Context {
            context: context.clone().unwrap_or_default(),
            source,
        })?;

        tracing::debug!(
            cluster_url = %config.cluster_url,
            context = context.as_deref().unwrap_or("<none>"),
            "loaded cluster config"
        );

        let client = kube::Client::try_from(config).map_err(ConfigError::Client)?;

        Ok(Self {
            client,
            context,
            default_namespace,
        })
    }

    /// Name of the kubeconfig context in use
    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    /// Namespace configured on the selected context, if any
    pub fn default_namespace(&self) -> Option<&str> {
        self.default_namespace.as_deref()
    }
}

/// Read the kubeconfig from an explicit path or the default locations
fn load_kubeconfig(path: Option<&Path>) -> Result<Kubeconfig, ConfigError> {
    match path {
        Some(path) => {
            if !path.exists() {
                return Err(ConfigError::KubeconfigNotFound(path.to_path_buf()));
            }
            Kubeconfig::read_from(path).map_err(|source| ConfigError::InvalidKubeconfig {
                path: path.to_path_buf(),
                source,
            })
        }
        None => Kubeconfig::read().map_err(ConfigError::NoKubeconfig),
    }
}

/// Namespace set on the named context.
///
/// A context name that is not in the kubeconfig is an error; no context at
/// all just means there is no default namespace.
fn context_namespace(
    kubeconfig: &Kubeconfig,
    context: Option<&str>,
) -> Result<Option<String>, ConfigError> {
    let Some(context_name) = context else {
        return Ok(None);
    };

    let named = kubeconfig
        .contexts
        .iter()
        .find(|c| c.name == context_name)
        .ok_or_else(|| ConfigError::ContextNotFound(context_name.to_string()))?;

    Ok(named
        .context
        .as_ref()
        .and_then(|c| c.namespace.clone())
        .filter(|ns| !ns.is_empty()))
}
