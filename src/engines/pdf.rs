use super::{probe_tool, run_tool, ConvertEngine, TargetFormat};
use crate::category::Category;
use crate::error::{AppError, Result};
use crate::workspace::Workspace;
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

pub struct PdfEngine {
    /// Path to the poppler pdftoppm executable
    pdftoppm_path: Option<String>,
    timeout: Option<Duration>,
}

impl PdfEngine {
    pub fn new() -> Self {
        Self {
            pdftoppm_path: None,
            timeout: None,
        }
    }

    pub fn with_pdftoppm_path(mut self, path: String) -> Self {
        self.pdftoppm_path = Some(path);
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn get_pdftoppm_path(&self) -> String {
        if let Some(path) = &self.pdftoppm_path {
            return path.clone();
        }

        if let Ok(path) = std::env::var("PDFTOPPM_PATH") {
            return path;
        }

        "pdftoppm".to_string()
    }
}

impl Default for PdfEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// pdftoppm spells a few formats differently from their file extension.
fn format_flag(format: &TargetFormat) -> String {
    match format.as_str() {
        "jpg" | "jpeg" => "-jpeg".to_string(),
        "tif" | "tiff" => "-tiff".to_string(),
        other => format!("-{}", other),
    }
}

/// Page number encoded in `<base>-<page>.<ext>`, zero padding ignored.
fn page_number(suffix: &str) -> Option<u64> {
    suffix.split('.').next()?.parse().ok()
}

/// Every file in `base`'s directory named `<base>-*`, in page order.
///
/// The trailing `-` keeps `temp_ab` from picking up `temp_abc-1.png`.
async fn collect_pages(base: &Path) -> Result<Vec<PathBuf>> {
    let (Some(dir), Some(stem)) = (base.parent(), base.file_name().and_then(|n| n.to_str())) else {
        return Err(AppError::Internal(format!(
            "Bad output base name: {}",
            base.display()
        )));
    };
    let prefix = format!("{}-", stem);

    let mut pages = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if let Some(suffix) = name.strip_prefix(&prefix) {
            pages.push((page_number(suffix), name.to_string(), entry.path()));
        }
    }

    pages.sort();
    Ok(pages.into_iter().map(|(_, _, path)| path).collect())
}

#[async_trait]
impl ConvertEngine for PdfEngine {
    fn category(&self) -> Category {
        Category::Pdf
    }

    async fn is_available(&self) -> bool {
        probe_tool(&self.get_pdftoppm_path(), "-v").await
    }

    async fn convert(
        &self,
        input_path: &Path,
        format: &TargetFormat,
        workspace: &Workspace,
    ) -> Result<Vec<PathBuf>> {
        // pdftoppm would read a relative name like `-x.pdf` as an option
        let input = std::path::absolute(input_path)?;
        let base = workspace.allocate_base().await?;

        info!(
            "Rasterizing {} to {} pages using pdftoppm",
            input_path.display(),
            format.as_str()
        );

        let args: Vec<OsString> = vec![
            format_flag(format).into(),
            input.into(),
            base.clone().into(),
        ];
        if let Err(e) = run_tool(&self.get_pdftoppm_path(), &args, self.timeout).await {
            let partial = collect_pages(&base).await.unwrap_or_default();
            return Err(e.with_leftovers(partial));
        }

        let pages = collect_pages(&base).await?;
        if pages.is_empty() {
            return Err(AppError::conversion(format!(
                "pdftoppm produced no pages for {}",
                input_path.display()
            )));
        }

        info!("Rasterized {} page(s)", pages.len());
        Ok(pages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_flag() {
        let flag = |f: &str| format_flag(&TargetFormat::parse(f).unwrap());
        assert_eq!(flag("png"), "-png");
        assert_eq!(flag("jpg"), "-jpeg");
        assert_eq!(flag("JPEG"), "-jpeg");
        assert_eq!(flag("tif"), "-tiff");
    }

    #[test]
    fn test_page_number() {
        assert_eq!(page_number("1.png"), Some(1));
        assert_eq!(page_number("007.jpg"), Some(7));
        assert_eq!(page_number("x.png"), None);
    }

    #[tokio::test]
    async fn test_collect_pages_orders_numerically() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("temp_abc");
        for page in [10, 2, 1, 11, 3] {
            std::fs::write(dir.path().join(format!("temp_abc-{}.png", page)), b"").unwrap();
        }

        let pages = collect_pages(&base).await.unwrap();
        let names: Vec<_> = pages
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(
            names,
            [
                "temp_abc-1.png",
                "temp_abc-2.png",
                "temp_abc-3.png",
                "temp_abc-10.png",
                "temp_abc-11.png"
            ]
        );
    }

    #[tokio::test]
    async fn test_collect_pages_ignores_other_prefixes() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("temp_ab");
        std::fs::write(dir.path().join("temp_ab-1.png"), b"").unwrap();
        std::fs::write(dir.path().join("temp_abc-1.png"), b"").unwrap();
        std::fs::write(dir.path().join("temp_ab.pdf"), b"").unwrap();

        let pages = collect_pages(&base).await.unwrap();
        assert_eq!(pages, vec![dir.path().join("temp_ab-1.png")]);
    }

    #[cfg(unix)]
    mod with_fake_rasterizer {
        use super::*;
        use crate::engines::fake_tool;

        /// A pdftoppm stand-in writing `<base>-<n>.png` for each listed page label.
        fn fake_pdftoppm(dir: &Path, labels: &[&str]) -> PdfEngine {
            let body = format!(
                "for page in {}; do printf 'page' > \"$3-$page.png\"; done",
                labels.join(" ")
            );
            let tool = fake_tool::install(dir, "pdftoppm", &body);
            PdfEngine::new().with_pdftoppm_path(tool.to_string_lossy().into_owned())
        }

        fn sample_pdf(dir: &Path) -> PathBuf {
            let input = dir.join("doc.pdf");
            std::fs::write(&input, b"%PDF-1.4").unwrap();
            input
        }

        #[tokio::test]
        async fn test_single_page() {
            let tools = tempfile::tempdir().unwrap();
            let work = tempfile::tempdir().unwrap();
            let engine = fake_pdftoppm(tools.path(), &["1"]);
            let ws = Workspace::new(work.path());

            let pages = engine
                .convert(&sample_pdf(tools.path()), &TargetFormat::parse("png").unwrap(), &ws)
                .await
                .unwrap();
            assert_eq!(pages.len(), 1);
            assert!(pages[0].to_str().unwrap().ends_with("-1.png"));
        }

        #[tokio::test]
        async fn test_three_pages_in_order() {
            let tools = tempfile::tempdir().unwrap();
            let work = tempfile::tempdir().unwrap();
            let engine = fake_pdftoppm(tools.path(), &["3", "1", "2"]);
            let ws = Workspace::new(work.path());

            let pages = engine
                .convert(&sample_pdf(tools.path()), &TargetFormat::parse("png").unwrap(), &ws)
                .await
                .unwrap();
            let suffixes: Vec<_> = pages
                .iter()
                .map(|p| p.to_str().unwrap().rsplit('-').next().unwrap().to_string())
                .collect();
            assert_eq!(suffixes, ["1.png", "2.png", "3.png"]);
        }

        #[tokio::test]
        async fn test_zero_padded_pages_in_order() {
            let tools = tempfile::tempdir().unwrap();
            let work = tempfile::tempdir().unwrap();
            let labels: Vec<String> = (1..=12).rev().map(|n| format!("{:02}", n)).collect();
            let labels: Vec<&str> = labels.iter().map(String::as_str).collect();
            let engine = fake_pdftoppm(tools.path(), &labels);
            let ws = Workspace::new(work.path());

            let pages = engine
                .convert(&sample_pdf(tools.path()), &TargetFormat::parse("png").unwrap(), &ws)
                .await
                .unwrap();
            assert_eq!(pages.len(), 12);
            assert!(pages[0].to_str().unwrap().ends_with("-01.png"));
            assert!(pages[11].to_str().unwrap().ends_with("-12.png"));
        }

        #[tokio::test]
        async fn test_ignores_pages_from_other_calls() {
            let tools = tempfile::tempdir().unwrap();
            let work = tempfile::tempdir().unwrap();
            let engine = fake_pdftoppm(tools.path(), &["1", "2"]);
            let ws = Workspace::new(work.path());

            // leftovers of an earlier, unrelated conversion
            let other = ws.allocate_base().await.unwrap();
            let decoy = PathBuf::from(format!("{}-1.png", other.display()));
            std::fs::write(&decoy, b"other").unwrap();

            let first = engine
                .convert(&sample_pdf(tools.path()), &TargetFormat::parse("png").unwrap(), &ws)
                .await
                .unwrap();
            let second = engine
                .convert(&sample_pdf(tools.path()), &TargetFormat::parse("png").unwrap(), &ws)
                .await
                .unwrap();

            assert_eq!(first.len(), 2);
            assert_eq!(second.len(), 2);
            assert!(!first.contains(&decoy));
            assert!(first.iter().all(|p| !second.contains(p)));
        }

        #[tokio::test]
        async fn test_failure_reports_partial_pages() {
            let tools = tempfile::tempdir().unwrap();
            let work = tempfile::tempdir().unwrap();
            let tool = fake_tool::install(
                tools.path(),
                "pdftoppm",
                "printf 'p' > \"$3-1.png\"\necho 'Syntax Error: broken xref' >&2\nexit 1",
            );
            let engine = PdfEngine::new().with_pdftoppm_path(tool.to_string_lossy().into_owned());
            let ws = Workspace::new(work.path());

            let err = engine
                .convert(&sample_pdf(tools.path()), &TargetFormat::parse("png").unwrap(), &ws)
                .await
                .unwrap_err();

            assert!(err.to_string().contains("broken xref"));
            assert_eq!(err.leftovers().len(), 1);
            // not cleaned up on the caller's behalf
            assert!(err.leftovers()[0].exists());
        }

        #[tokio::test]
        async fn test_no_pages_is_an_error() {
            let tools = tempfile::tempdir().unwrap();
            let work = tempfile::tempdir().unwrap();
            let engine = fake_pdftoppm(tools.path(), &[]);
            let ws = Workspace::new(work.path());

            let err = engine
                .convert(&sample_pdf(tools.path()), &TargetFormat::parse("png").unwrap(), &ws)
                .await
                .unwrap_err();
            assert_eq!(err.kind(), "conversion_failed");
        }

        #[tokio::test]
        async fn test_input_passed_as_absolute_path() {
            let tools = tempfile::tempdir().unwrap();
            let work = tempfile::tempdir().unwrap();
            let tool = fake_tool::install(
                tools.path(),
                "pdftoppm",
                "case \"$2\" in /*-weird.pdf) ;; *) exit 7;; esac\nprintf 'p' > \"$3-1.png\"",
            );
            let engine = PdfEngine::new().with_pdftoppm_path(tool.to_string_lossy().into_owned());
            let ws = Workspace::new(work.path());

            let pages = engine
                .convert(
                    Path::new("-weird.pdf"),
                    &TargetFormat::parse("png").unwrap(),
                    &ws,
                )
                .await
                .unwrap();
            assert_eq!(pages.len(), 1);
        }

        #[tokio::test]
        async fn test_passes_format_flag() {
            let tools = tempfile::tempdir().unwrap();
            let work = tempfile::tempdir().unwrap();
            let tool = fake_tool::install(
                tools.path(),
                "pdftoppm",
                "[ \"$1\" = \"-jpeg\" ] || exit 9\nprintf 'p' > \"$3-1.jpg\"",
            );
            let engine = PdfEngine::new().with_pdftoppm_path(tool.to_string_lossy().into_owned());
            let ws = Workspace::new(work.path());

            let pages = engine
                .convert(&sample_pdf(tools.path()), &TargetFormat::parse("jpg").unwrap(), &ws)
                .await
                .unwrap();
            assert_eq!(pages[0].extension().unwrap(), "jpg");
        }
    }
}
