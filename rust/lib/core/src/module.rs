use axum::Router;

/// A business module that contributes HTTP routes.
///
/// `invctld` collects every module and nests its routes under `/{name}`.
/// Routes returned here are already bound to their state.
pub trait Module: Send + Sync {
    /// Module name, used for logging and as the route prefix.
    fn name(&self) -> &str;

    /// Routes relative to the module prefix.
    fn routes(&self) -> Router;
}
