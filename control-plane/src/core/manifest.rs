//! Chaos-mesh manifest rendering
//!
//! Pure functions turning fault parameters into the YAML documents fed to
//! `kubectl apply -f -`. Nothing here reads the clock; callers supply any
//! time-based disambiguator.

/// Parameters of a `NetworkChaos` delay rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkDelaySpec<'a> {
    pub name: &'a str,
    pub namespace: &'a str,
    pub source_service: &'a str,
    pub target_service: &'a str,
    pub delay_seconds: u64,
    pub duration_minutes: u64,
}

/// What a JVM rule does once it fires
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JvmRuleMode<'a> {
    /// Throw a runtime exception at method entry, naming the interface
    Exception { interface_name: &'a str },
    /// Hold the method for a fixed number of milliseconds
    Latency { latency_ms: u64 },
}

/// Parameters of a `JVMChaos` rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JvmRuleSpec<'a> {
    pub name: &'a str,
    pub namespace: &'a str,
    pub service_name: &'a str,
    pub duration_minutes: u64,
    pub port: u16,
    pub class_name: &'a str,
    pub method_name: &'a str,
    pub mode: JvmRuleMode<'a>,
    /// Caller-supplied value keeping the inner rule name unique
    pub nonce: i64,
}

/// Render a `NetworkChaos` delay manifest
///
/// The selector always targets `target_service`. When the source differs,
/// a `target:` block restricts the delay to traffic coming from the source.
pub fn render_network_delay(spec: &NetworkDelaySpec<'_>) -> String {
    let mut yaml = format!(
        "apiVersion: chaos-mesh.org/v1alpha1
kind: NetworkChaos
metadata:
  name: {name}
  namespace: {namespace}
spec:
  action: delay
  mode: one
  selector:
    labelSelectors:
      app: {target}
  delay:
    latency: {delay}s
    correlation: '100'
    jitter: 0ms
  duration: {duration}m
",
        name = spec.name,
        namespace = spec.namespace,
        target = spec.target_service,
        delay = spec.delay_seconds,
        duration = spec.duration_minutes,
    );

    if spec.source_service != spec.target_service {
        yaml.push_str(&format!(
            "  target:
    selector:
      labelSelectors:
        app: {source}
    mode: one
",
            source = spec.source_service
        ));
    }

    yaml
}

/// Render a `JVMChaos` manifest in exception or latency mode
pub fn render_jvm_rule(spec: &JvmRuleSpec<'_>) -> String {
    match spec.mode {
        JvmRuleMode::Exception { interface_name } => render_jvm_exception(spec, interface_name),
        JvmRuleMode::Latency { latency_ms } => render_jvm_latency(spec, latency_ms),
    }
}

fn render_jvm_exception(spec: &JvmRuleSpec<'_>, interface_name: &str) -> String {
    format!(
        "kind: JVMChaos
apiVersion: chaos-mesh.org/v1alpha1
metadata:
  namespace: {namespace}
  name: {name}
  annotations:
    experiment.chaos-mesh.org/pause: 'false'
spec:
  selector:
    namespaces:
      - {namespace}
    labelSelectors:
      app: {service}
  mode: all
  duration: {duration}m
  action: ruleData
  port: {port}
  name: '--ruleData-{nonce}'
  value: ''
  exception: ''
  latency: 0
  ruleData: |-
    RULE Inject500Error
    CLASS {class}
    METHOD {method}
    AT ENTRY
    IF true
        DO throw new RuntimeException(\"Simulated server error for {interface}\");
    ENDRULE",
        namespace = spec.namespace,
        name = spec.name,
        service = spec.service_name,
        duration = spec.duration_minutes,
        port = spec.port,
        nonce = spec.nonce,
        class = spec.class_name,
        method = spec.method_name,
        interface = interface_name,
    )
}

fn render_jvm_latency(spec: &JvmRuleSpec<'_>, latency_ms: u64) -> String {
    format!(
        "kind: JVMChaos
apiVersion: chaos-mesh.org/v1alpha1
metadata:
  namespace: {namespace}
  name: {name}
spec:
  selector:
    namespaces:
      - {namespace}
    labelSelectors:
      app: {service}
  mode: all
  duration: {duration}m
  action: latency
  port: {port}
  class: {class}
  method: {method}
  name: {class}-latency-{nonce}
  value: ''
  exception: ''
  latency: {latency_ms}
  ruleData: ''",
        namespace = spec.namespace,
        name = spec.name,
        service = spec.service_name,
        duration = spec.duration_minutes,
        port = spec.port,
        class = spec.class_name,
        method = spec.method_name,
        nonce = spec.nonce,
    )
}
