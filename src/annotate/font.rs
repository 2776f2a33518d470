use ultralytics_inference as ul;

/// Read a label font, downloading it to the toolkit's cache on first use.
pub fn load_font(font_name: &str) -> Option<Vec<u8>> {
    let font_path = ul::annotate::check_font(font_name)?;
    match std::fs::read(&font_path) {
        Ok(data) => Some(data),
        Err(e) => {
            tracing::warn!("Failed to read font {:?}: {}", font_path, e);
            None
        }
    }
}
