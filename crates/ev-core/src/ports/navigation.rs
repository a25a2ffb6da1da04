use crate::access::RouteTarget;

/// Route changes requested by the workflow. The shell decides how to render
/// them.
pub trait NavigatorPort: Send + Sync {
    fn navigate(&self, target: RouteTarget);
}
