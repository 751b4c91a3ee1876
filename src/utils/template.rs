//! String template rendering utilities.

pub struct TemplateVars;

impl TemplateVars {
    pub const APP_NAME: &'static str = "appName";
    pub const CLIENT_DIR: &'static str = "clientDir";
    pub const CLIENT_OUTPUT: &'static str = "clientOutput";
    pub const SERVER_ENTRY: &'static str = "serverEntry";
    pub const BUNDLE_OUTPUT: &'static str = "bundleOutput";
    pub const BUNDLE_PATH: &'static str = "bundlePath";
    pub const PUBLIC_DIR: &'static str = "publicDir";
    pub const PUBLIC_PATH: &'static str = "publicPath";
    pub const SSL_PARAM: &'static str = "sslParam";
    pub const ENV_VAR: &'static str = "envVar";
}

pub fn render(template: &str, variables: &[(&str, &str)]) -> String {
    let mut result = template.to_string();

    for (key, value) in variables {
        let placeholder = format!("{{{{{}}}}}", key);
        result = result.replace(&placeholder, value);
    }

    result
}

/// Render with owned values, as produced by `Layout::template_vars`.
pub fn render_owned(template: &str, variables: &[(&str, String)]) -> String {
    let borrowed: Vec<(&str, &str)> = variables
        .iter()
        .map(|(key, value)| (*key, value.as_str()))
        .collect();
    render(template, &borrowed)
}
