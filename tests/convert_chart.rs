use kots2helm::auditor;
use kots2helm::config::Config;
use kots2helm::converter::{ChartMetadata, FileStatus, convert_chart};
use kots2helm::output::{OutputFormatter, human::HumanFormatter};
use kots2helm::schema::KotsConfigDecoder;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const CONFIG: &str = r#"apiVersion: kots.io/v1beta1
kind: Config
metadata:
  name: sample
spec:
  groups:
    - name: database
      title: Database
      items:
        - name: postgres_host
          title: Host
          type: text
          default: postgres
        - name: postgres_password
          type: password
        - name: embedded
          type: bool
          default: "1"
    - name: ingress
      items:
        - name: hostname
          type: string
          default: app.example.com
        - name: tls_mode
"#;

const APPLICATION: &str = r#"apiVersion: kots.io/v1beta1
kind: Application
metadata:
  name: sample
spec:
  title: Sample
"#;

const PREFLIGHT: &str = r#"apiVersion: troubleshoot.replicated.com/v1beta1
kind: Preflight
metadata:
  name: checks
"#;

const DEPLOYMENT: &str = r#"apiVersion: apps/v1
kind: Deployment
metadata:
  name: api
  namespace: repl{{ Namespace }}
spec:
  template:
    spec:
      containers:
        - name: api
          image: api:1.0
          env:
            - name: DB_HOST
              value: '{{repl ConfigOption "postgres_host"}}'
            - name: DB_PASSWORD
              value: '{{repl ConfigOption "postgres_password" | Base64Encode }}'
            - name: EMBEDDED
              value: '{{repl ConfigOptionEquals "embedded" "1"}}'
            - name: KURL
              value: '{{repl not IsKurl}}'
"#;

const INGRESS: &str = r#"apiVersion: networking.k8s.io/v1
kind: Ingress
metadata:
  name: api
  annotations:
    kots.io/exclude: '{{repl ConfigOptionEquals "tls_mode" "off"}}'
spec:
  rules:
    - host: repl{{ ConfigOption "hostname" }}
"#;

const NOTES: &str = r#"{{repl if ConfigOptionEquals "embedded" "true"}}
Embedded database at {{repl ConfigOption "postgres_host"}}
{{repl else}}
External database
{{repl end}}
Licensed to {{repl LicenseFieldValue "customer"}}
"#;

fn write(dir: &Path, name: &str, content: &str) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create parent dir");
    }
    fs::write(path, content).expect("Failed to write fixture");
}

fn sample_app() -> TempDir {
    let dir = TempDir::new().expect("Failed to create temp dir");
    write(dir.path(), "kots-config.yaml", CONFIG);
    write(dir.path(), "kots-app.yaml", APPLICATION);
    write(dir.path(), "preflight.yaml", PREFLIGHT);
    write(dir.path(), "manifests/deployment.yaml", DEPLOYMENT);
    write(dir.path(), "manifests/ingress.yaml", INGRESS);
    write(dir.path(), "manifests/NOTES.txt", NOTES);
    write(dir.path(), "charts/redis-1.0.0.tgz", "{{repl Namespace}}");
    dir
}

fn read(path: PathBuf) -> String {
    fs::read_to_string(&path).unwrap_or_else(|e| panic!("Failed to read {}: {e}", path.display()))
}

fn run(config: &Config) -> (TempDir, TempDir, kots2helm::converter::ChartReport) {
    let input = sample_app();
    let output = TempDir::new().expect("Failed to create temp dir");
    let report = convert_chart(
        input.path(),
        output.path(),
        &ChartMetadata::new("sample", "1.2.3"),
        config,
        &[&KotsConfigDecoder],
    )
    .expect("Conversion failed");
    (input, output, report)
}

#[test]
fn test_chart_layout() {
    let (_input, output, report) = run(&Config::default());

    assert_eq!(read(output.path().join("Chart.yaml")), "apiVersion: v2\nname: sample\nversion: 1.2.3\n");
    assert_eq!(
        read(output.path().join("values.yaml")),
        "isKurl: false\n\
         database:\n  postgres_host: postgres\n  postgres_password: ''\n  embedded: true\n\
         ingress:\n  hostname: app.example.com\n  tls_mode: ''\n"
    );

    assert_eq!(report.schema_path, Some(PathBuf::from("kots-config.yaml")));
    assert_eq!(
        report.removed,
        vec![
            PathBuf::from("kots-app.yaml"),
            PathBuf::from("kots-config.yaml"),
            PathBuf::from("preflight.yaml"),
        ]
    );
    let templates = report.templates_dir();
    for removed in &report.removed {
        assert!(!templates.join(removed).exists());
    }

    // Vendored archives are copied but never translated
    assert_eq!(read(templates.join("charts/redis-1.0.0.tgz")), "{{repl Namespace}}");
}

#[test]
fn test_deployment_translated() {
    let (_input, _output, report) = run(&Config::default());
    let deployment = read(report.templates_dir().join("manifests/deployment.yaml"));

    assert!(deployment.contains("namespace: {{ .Release.Namespace }}"));
    assert!(deployment.contains("value: '{{ .Values.database.postgres_host }}'"));
    assert!(deployment.contains("value: '{{ .Values.database.postgres_password | Base64Encode }}'"));
    assert!(
        deployment.contains("value: '{{ if eq .Values.database.embedded true }}true{{ else }}false{{ end }}'")
    );
    assert!(deployment.contains("value: '{{ not .Values.isKurl }}'"));
    assert_eq!(auditor::count(&deployment), 0);
}

#[test]
fn test_exclude_annotation_wraps_document() {
    let (_input, _output, report) = run(&Config::default());
    let ingress = read(report.templates_dir().join("manifests/ingress.yaml"));

    // tls_mode has no type, so it compares as a string
    assert!(ingress.starts_with(
        r#"{{ if not (eq (tpl "{{ if eq .Values.ingress.tls_mode \"off\" }}true{{ else }}false{{ end }}" $) "true") }}"#
    ));
    assert!(ingress.trim_end().ends_with("{{ end }}"));
    assert!(!ingress.contains("kots.io/exclude"));
    assert!(ingress.contains("{{ .Values.ingress.hostname }}"));
    assert_eq!(auditor::count(&ingress), 0);
}

#[test]
fn test_residuals_reported() {
    let (_input, _output, report) = run(&Config::default());

    assert!(!report.is_success());
    assert_eq!(report.conversion.total_residuals(), 1);

    let notes = report
        .conversion
        .files
        .iter()
        .find(|f| f.path == Path::new("manifests/NOTES.txt"))
        .expect("NOTES.txt missing from report");
    assert_eq!(notes.status, FileStatus::Converted);
    assert_eq!(notes.residuals.len(), 1);
    assert_eq!(notes.residuals[0].line, 6);
    assert_eq!(notes.residuals[0].excerpt, "{{repl LicenseFieldValue \"customer\"}}");

    let rendered = read(report.templates_dir().join("manifests/NOTES.txt"));
    assert!(rendered.starts_with("{{ if eq .Values.database.embedded true }}\n"));
    assert!(rendered.contains("{{ else }}\nExternal database\n{{ end }}\n"));

    let summary = HumanFormatter::with_colors(false).format_results(&report.conversion.residuals());
    assert!(summary.contains("manifests/NOTES.txt"));
    assert!(summary.ends_with("Found 1 residual directive in 1 file"));
}

#[test]
fn test_inline_and_parallel_conversion() {
    let config = Config {
        expand_config_option_equals: false,
        parallel: true,
        ..Config::default()
    };
    let (_input, _output, report) = run(&config);
    let deployment = read(report.templates_dir().join("manifests/deployment.yaml"));

    assert!(deployment.contains("value: '{{ eq .Values.database.embedded true }}'"));

    // Annotations still use the expanded form
    let ingress = read(report.templates_dir().join("manifests/ingress.yaml"));
    assert!(ingress.contains("true{{ else }}false{{ end }}"));

    let paths: Vec<&Path> = report.conversion.files.iter().map(|f| f.path.as_path()).collect();
    let mut sorted = paths.clone();
    sorted.sort();
    assert_eq!(paths, sorted);
}
