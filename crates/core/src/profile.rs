use std::{fs, path::Path};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Organization wide constants embedded into every rendered signature.
///
/// Every field has a default matching the ITF Group signature, so a profile
/// file only needs to list the values it overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrganizationProfile {
    pub address: String,
    pub linkedin_url: String,
    pub facebook_url: String,
    pub website_url: String,
    pub website_display: String,
    /// Used when a submission does not carry its own meeting link.
    pub default_meeting_url: String,
    /// Base URL that image file names are resolved against, without a trailing slash.
    pub asset_base_url: String,
    pub carrier_rating_url: String,
    pub solutions: Vec<SolutionBanner>,
}

/// One linked image in the banner row under the signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolutionBanner {
    pub href: String,
    pub image: String,
    pub alt: String,
}

impl SolutionBanner {
    fn new(href: &str, image: &str, alt: &str) -> Self {
        Self {
            href: href.to_string(),
            image: image.to_string(),
            alt: alt.to_string(),
        }
    }
}

impl Default for OrganizationProfile {
    fn default() -> Self {
        Self {
            address: "11990 Missouri Bottom Road Hazelwood, MO 63042".to_string(),
            linkedin_url: "https://www.linkedin.com/company/itf-llc-group/about/".to_string(),
            facebook_url: "https://www.facebook.com/itfgroup".to_string(),
            website_url: "http://itfgroup.com/".to_string(),
            website_display: "www.itfgroup.com".to_string(),
            default_meeting_url: "https://meetings.hubspot.com/sam-burkhan".to_string(),
            asset_base_url: "https://prodwebsitesassets.blob.core.windows.net/email-assets/ITF"
                .to_string(),
            carrier_rating_url: "https://www.carriersource.io/carriers/itf-group-llc?utm_campaign=itf-group-llc&utm_medium=email&utm_source=email_signature".to_string(),
            solutions: vec![
                SolutionBanner::new(
                    "https://itfgroup.com/solutions/forwarding",
                    "Global_Forwarding.png",
                    "Certification 1",
                ),
                SolutionBanner::new(
                    "https://itfgroup.com/solutions/logistics",
                    "Logistics.png",
                    "Certification 1",
                ),
                SolutionBanner::new(
                    "https://itfgroup.com/solutions/trucking",
                    "Trucking.png",
                    "Certification 1",
                ),
                SolutionBanner::new("https://itfgroup.com/", "ITF_logo_banner.png", "Certification 4"),
                SolutionBanner::new(
                    "https://itfgroup.com/solutions/tech",
                    "Technology.png",
                    "Certification 1",
                ),
                SolutionBanner::new(
                    "https://itfgroup.com/solutions/d-f",
                    "d_and_f.png",
                    "Certification 1",
                ),
            ],
        }
    }
}

impl OrganizationProfile {
    /// Reads a JSON profile, filling omitted keys from [`OrganizationProfile::default`].
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ProfileError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ProfileError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let profile: Self = serde_json::from_str(&raw)?;
        profile.validate()?;
        Ok(profile)
    }

    /// Resolves an asset file name against [`Self::asset_base_url`].
    pub fn asset_url(&self, file_name: &str) -> String {
        format!("{}/{}", self.asset_base_url.trim_end_matches('/'), file_name)
    }

    fn validate(&self) -> Result<(), ProfileError> {
        if self.default_meeting_url.trim().is_empty() {
            return Err(ProfileError::Missing("default_meeting_url"));
        }
        if self.asset_base_url.trim().is_empty() {
            return Err(ProfileError::Missing("asset_base_url"));
        }
        Ok(())
    }
}

/// Errors raised while loading an organization profile.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("failed to read profile {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode profile json: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("profile field {0} must not be empty")]
    Missing(&'static str),
}
