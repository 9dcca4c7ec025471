//! Domain layer for the signature generator: the submission form, phone
//! normalization, HTML escaping and the signature template renderer.

pub mod escape;
pub mod phone;
pub mod profile;
pub mod template;
pub mod types;

pub use profile::{OrganizationProfile, ProfileError, SolutionBanner};
pub use template::SignatureRenderer;
pub use types::{FieldError, FormError, FormField, SignatureForm, SignatureRecord};
