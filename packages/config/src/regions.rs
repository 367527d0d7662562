//! Static website endpoints per region.
//!
//! Older regions use the `s3-website-<region>` form, newer ones
//! `s3-website.<region>`. Regions missing from the table have no known
//! endpoint.

/// Website hosting endpoint of `region`, e.g.
/// `s3-website-us-east-1.amazonaws.com`.
#[must_use]
pub fn website_endpoint(region: &str) -> Option<&'static str> {
    Some(match region {
        "us-east-1" => "s3-website-us-east-1.amazonaws.com",
        "us-east-2" => "s3-website.us-east-2.amazonaws.com",
        "us-west-1" => "s3-website-us-west-1.amazonaws.com",
        "us-west-2" => "s3-website-us-west-2.amazonaws.com",
        "us-gov-west-1" => "s3-website-us-gov-west-1.amazonaws.com",
        "ca-central-1" => "s3-website.ca-central-1.amazonaws.com",
        "sa-east-1" => "s3-website-sa-east-1.amazonaws.com",
        "eu-west-1" => "s3-website-eu-west-1.amazonaws.com",
        "eu-west-2" => "s3-website.eu-west-2.amazonaws.com",
        "eu-west-3" => "s3-website.eu-west-3.amazonaws.com",
        "eu-central-1" => "s3-website.eu-central-1.amazonaws.com",
        "eu-north-1" => "s3-website.eu-north-1.amazonaws.com",
        "eu-south-1" => "s3-website.eu-south-1.amazonaws.com",
        "me-south-1" => "s3-website.me-south-1.amazonaws.com",
        "af-south-1" => "s3-website.af-south-1.amazonaws.com",
        "ap-east-1" => "s3-website.ap-east-1.amazonaws.com",
        "ap-south-1" => "s3-website.ap-south-1.amazonaws.com",
        "ap-northeast-1" => "s3-website-ap-northeast-1.amazonaws.com",
        "ap-northeast-2" => "s3-website.ap-northeast-2.amazonaws.com",
        "ap-northeast-3" => "s3-website.ap-northeast-3.amazonaws.com",
        "ap-southeast-1" => "s3-website-ap-southeast-1.amazonaws.com",
        "ap-southeast-2" => "s3-website-ap-southeast-2.amazonaws.com",
        "cn-northwest-1" => "s3-website.cn-northwest-1.amazonaws.com.cn",
        _ => return None,
    })
}

/// Public URL of a website bucket, if the region's endpoint is known.
#[must_use]
pub fn site_url(bucket: &str, region: &str) -> Option<String> {
    website_endpoint(region).map(|endpoint| format!("http://{bucket}.{endpoint}/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_endpoint_styles() {
        assert_eq!(
            website_endpoint("us-east-1"),
            Some("s3-website-us-east-1.amazonaws.com")
        );
        assert_eq!(
            website_endpoint("eu-central-1"),
            Some("s3-website.eu-central-1.amazonaws.com")
        );
    }

    #[test]
    fn site_url_for_known_region() {
        assert_eq!(
            site_url("my-website-bucket", "us-west-2").as_deref(),
            Some("http://my-website-bucket.s3-website-us-west-2.amazonaws.com/")
        );
    }

    #[test]
    fn unknown_region_has_no_url() {
        assert_eq!(website_endpoint("xx-nowhere-9"), None);
        assert_eq!(site_url("site", "xx-nowhere-9"), None);
    }
}
