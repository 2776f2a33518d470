use indicatif::ProgressStyle;

/// Progress style for counted work (archive entries, epochs)
pub fn progress_bar_style() -> ProgressStyle {
    ProgressStyle::with_template("{msg}: {wide_bar:.cyan/blue} {pos}/{len} [{elapsed_precise}]")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
}

/// Progress style for byte streams (dataset download)
pub fn download_bar_style() -> ProgressStyle {
    ProgressStyle::with_template(
        "{msg}: {wide_bar:.green/blue} {bytes}/{total_bytes} ({bytes_per_sec}) [{elapsed_precise}]",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
}
