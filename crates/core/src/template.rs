//! HTML email signature rendering.

use crate::escape::escape_html;
use crate::phone::phone_href;
use crate::profile::OrganizationProfile;
use crate::types::SignatureForm;

const FONT_STACK: &str = "system-ui, -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, Oxygen, Ubuntu, Cantarell, 'Open Sans', 'Helvetica Neue', sans-serif";

/// Renders signature documents for a fixed organization profile.
///
/// Rendering is a pure function of the profile and the form: the same input
/// always yields byte-identical output.
#[derive(Debug, Clone, Default)]
pub struct SignatureRenderer {
    profile: OrganizationProfile,
}

impl SignatureRenderer {
    pub fn new(profile: OrganizationProfile) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> &OrganizationProfile {
        &self.profile
    }

    /// Resolves the meeting URL for a form, falling back to the profile default
    /// when the link is absent or blank.
    pub fn meeting_url<'a>(&'a self, form: &'a SignatureForm) -> &'a str {
        form.meeting_link
            .as_deref()
            .filter(|link| !link.trim().is_empty())
            .unwrap_or(self.profile.default_meeting_url.as_str())
    }

    /// Produces the complete HTML document for `form`.
    pub fn render(&self, form: &SignatureForm) -> String {
        let profile = &self.profile;
        let asset = |file: &str| escape_html(&profile.asset_url(file)).into_owned();

        let name = escape_html(&form.name);
        let title = escape_html(&form.title);
        let phone_display = escape_html(&form.phone_number);
        let phone_href = phone_href(&form.phone_number);
        let email = escape_html(&form.email);
        let meeting_url = escape_html(self.meeting_url(form));

        let background = asset("grey-main-bg.png");
        let banners = self.render_banners();

        format!(
            r##"<!DOCTYPE html>
<html lang="en">

<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Document</title>
</head>

<body
    style="font-family:{font}">
    <table
        style="width: 600px;font-family: {font};">
        <tbody>
            <tr>
                <td
                    style="vertical-align: top; color: #0C1D32; font-size: 12px; line-height: 24px; font-family: {font}; width: 40%; text-align: left;">
                    <table style="width: 100%;" cellpadding="0" cellspacing="0">

                        <tr>
                            <td>
                                <span style="font-weight: bold; color: #FF3000; font-size: 16px;">{name}</span>
                            </td>
                        </tr>

                        <tr style="vertical-align: top">
                            <td style="width: 10%; color: #0C1D32; ">
                                <span
                                    style="width: 10%; color: #0C1D32 ; font-family: {font}; ">{title}</span>
                            </td>

                        </tr>
                        <tr>
                            <td>
                                <table style="padding-top:18px" cellpadding="0" cellspacing="0">
                                    <tr>
                                        <td style="padding-right: 4px;width: 30px;height: 30px;">
                                            <a href="{linkedin_url}"
                                                target="_blank" style="display: inline-block;height: 30px;">
                                                <img src="{linkedin_icon}"
                                                    width="32" height="32" style="border: 0; display: inline-block;"
                                                    alt="Linkedin">
                                            </a>
                                        </td>
                                        <td style="padding-right: 4px;width: 30px;height: 30px;">
                                            <a href="{facebook_url}" target="_blank"
                                                style="display: inline-block;height: 30px;">
                                                <img src="{facebook_icon}"
                                                    width="32" height="32" style="border: 0; display: inline-block;"
                                                    alt="Facebook">
                                            </a>
                                        </td>
                                    </tr>
                                </table>
                            </td>
                        </tr>

                    </table>
                </td>

                <td style="
                color: #0C1D32;
                font-size: 12px;
                line-height: 20px;
                font-family: {font};
                width: 40%;
                text-align: left;
                vertical-align: top;
                ">

                    <table cellpadding="0" cellspacing="0" style="width: 100%;">
                        <tr>
                            <td style="vertical-align: top; width: 16px; padding-right: 4px; padding-bottom: 6px;">
                                <img src="{call_icon}"
                                    alt="" style="width: 24px; display: block;" />
                            </td>
                            <td style="padding-bottom: 6px;">
                                <a href="{phone_href}" style="color:#0C1D32;text-decoration:none"
                                    target="_blank">
                                    {phone_display}
                                </a>
                            </td>
                        </tr>

                        <tr>
                            <td style="vertical-align: top; width: 16px; padding-right: 4px; padding-bottom: 6px;">
                                <img src="{location_icon}"
                                    alt="" style="width: 24px; display: block;" />
                            </td>
                            <td style="vertical-align: top;color: #0C1D32; text-decoration: none; padding-bottom: 6px;">
                                <span style="color:#0C1D32; text-decoration:none;">
                                    <a href="#"
                                        style="color:#0C1D32; text-decoration:none; pointer-events:none; cursor:default;">
                                        {address}
                                    </a>
                                </span>
                            </td>
                        </tr>

                        <tr>
                            <td style="vertical-align: top; width: 16px; padding-right: 4px; padding-bottom: 6px;">
                                <img src="{web_icon}"
                                    alt="" style="width: 24px; display: block;padding-top: 2px;" />
                            </td>
                            <td style="padding-bottom: 6px;">
                                <a href="{website_url}" style="color: #0C1D32; text-decoration: none;"
                                    target="_blank">
                                    {website_display}
                                </a>
                            </td>
                        </tr>

                        <tr>
                            <td style="vertical-align: top; width: 16px; padding-right: 4px; padding-bottom: 6px;">
                                <img src="{email_icon}"
                                    alt="" style="width: 24px; display: block;padding-top: 1px;" />
                            </td>
                            <td style="padding-bottom: 6px;">
                                <a href="mailto:{email}" style="color: #0C1D32; text-decoration: none;"
                                    target="_blank">
                                    {email}
                                </a>
                            </td>
                        </tr>
                    </table>
                </td>

                <td style="vertical-align: top; text-align: right; width: 30%;">
                    <table cellpadding="0" cellspacing="0">
                        <tr>
                            <td>
                                <img style="height: 44px;"
                                    src="{logo}"
                                    alt="Logo" />
                            </td>
                        </tr>
                        <tr>
                            <td>
                                <a
                                    href="{carrier_rating_url}">
                                    <img style="height: 82px;"
                                        src="{carrier_rating_badge}"
                                        alt="Logo" />
                                </a>
                            </td>
                        </tr>
                    </table>
                </td>

            </tr>
            <tr>
                <td colspan="3" style="height: 32px;">
                    <p style="margin: 0.1px">
                        <a href="{meeting_url}" style="
                            display: inline-block;
                            vertical-align: middle;
                        ">
                            <img src="{meeting_banner}"
                                alt="Footer Image" style="max-width: 102%; height: auto" class="CToWUd"
                                data-bit="iit" /></a>
                    </p>
                </td>
            </tr>

        </tbody>
    </table>
    <table
        style="width: 595px; border-collapse: collapse; background-image: url('{background}'); margin: 0px 0px 0px 5px;">
        <tbody>
            <tr
                style="background-image: url('{background}');">
                <td colspan="3"
                    style="padding: 0px 0; text-align: center;background-image: url('{background}');">
                    <table cellpadding="0" cellspacing="0"
                        style="width: 100%; margin: 0 auto;background-image: url('{background}');">
                        <tr>
{banners}

                        </tr>
                    </table>
                </td>
            </tr>

            <tr>
                <td colspan="3"
                    style="height: 32px;margin-top: 100px;background-image: url('{background}');">

                    <p style="margin: -2px">
                        <a style="
                            display: inline-block;
                            vertical-align: middle;
                        "><img src="{certification_line}"
                                alt="Footer Image" style="max-width: 100%; height: auto" class="CToWUd"
                                data-bit="iit" /></a>
                    </p>
                    <p style="margin: 0.1px">
                        <a style="
                            display: inline-block;
                            vertical-align: middle;
                        "><img src="{certification_badge}"
                                alt="Footer Image" style="max-width: 100%; height: auto" class="CToWUd"
                                data-bit="iit" /></a>
                    </p>
                </td>
            </tr>
        </tbody>
    </table>
</body>

</html>"##,
            font = FONT_STACK,
            linkedin_url = escape_html(&profile.linkedin_url),
            linkedin_icon = asset("linkedin.png"),
            facebook_url = escape_html(&profile.facebook_url),
            facebook_icon = asset("facebook.png"),
            call_icon = asset("call-white.png"),
            location_icon = asset("location-white.png"),
            address = escape_html(&profile.address),
            web_icon = asset("web-white.png"),
            website_url = escape_html(&profile.website_url),
            website_display = escape_html(&profile.website_display),
            email_icon = asset("email-white.png"),
            logo = asset("itf-logo.png"),
            carrier_rating_url = escape_html(&profile.carrier_rating_url),
            carrier_rating_badge = asset("CarrierSource_Rating_v2.png"),
            meeting_banner = asset("call_truck_banner.png"),
            certification_line = asset("certi_rect_line.png"),
            certification_badge = asset("email_certification.gif"),
        )
    }

    fn render_banners(&self) -> String {
        let mut cells = String::new();
        for (index, banner) in self.profile.solutions.iter().enumerate() {
            let spacing = BANNER_SPACING
                .get(index)
                .copied()
                .unwrap_or(BannerSpacing::PLAIN);
            if index > 0 {
                cells.push('\n');
            }
            cells.push_str(&format!(
                r#"                            <td style="padding: 0px;background-color: #F3F3F4;{cell_pad}">
                                <a href="{href}" target="_blank">
                                    <img src="{src}"
                                        alt="{alt}" style="max-width: 100%{img_pad}" />
{gap}                                </a>

                            </td>"#,
                cell_pad = if spacing.cell_pad { " " } else { "" },
                img_pad = if spacing.img_pad { " " } else { "" },
                gap = if spacing.gap_before_close { "\n" } else { "" },
                href = escape_html(&banner.href),
                src = escape_html(&self.profile.asset_url(&banner.image)),
                alt = escape_html(&banner.alt),
            ));
        }
        cells
    }
}

/// Whitespace quirks of each banner cell in the published layout.
#[derive(Debug, Clone, Copy)]
struct BannerSpacing {
    cell_pad: bool,
    img_pad: bool,
    gap_before_close: bool,
}

impl BannerSpacing {
    const PLAIN: Self = Self::new(false, false, true);

    const fn new(cell_pad: bool, img_pad: bool, gap_before_close: bool) -> Self {
        Self {
            cell_pad,
            img_pad,
            gap_before_close,
        }
    }
}

const BANNER_SPACING: [BannerSpacing; 6] = [
    BannerSpacing::new(true, false, false),
    BannerSpacing::new(true, true, true),
    BannerSpacing::new(true, false, true),
    BannerSpacing::new(true, false, false),
    BannerSpacing::new(false, false, true),
    BannerSpacing::new(false, false, true),
];
