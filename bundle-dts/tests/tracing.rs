use bundle_dts::fake::reassemble::ReassembleOptions;
use bundle_dts::fake::synthesize::SynthesizeOptions;
use bundle_dts::BuildRegistry;
use std::io;
use std::sync::Arc;
use std::sync::Mutex;
use tracing_subscriber::fmt::MakeWriter;

#[derive(Clone, Default)]
struct SharedWriter {
  buffer: Arc<Mutex<Vec<u8>>>,
}

impl SharedWriter {
  fn contents(&self) -> String {
    String::from_utf8(self.buffer.lock().unwrap().clone()).unwrap()
  }
}

struct SharedWriterGuard<'a> {
  buffer: &'a Arc<Mutex<Vec<u8>>>,
}

impl io::Write for SharedWriterGuard<'_> {
  fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
    self.buffer.lock().unwrap().extend_from_slice(buf);
    Ok(buf.len())
  }

  fn flush(&mut self) -> io::Result<()> {
    Ok(())
  }
}

impl<'a> MakeWriter<'a> for SharedWriter {
  type Writer = SharedWriterGuard<'a>;

  fn make_writer(&'a self) -> Self::Writer {
    SharedWriterGuard {
      buffer: &self.buffer,
    }
  }
}

#[test]
fn dropped_dependencies_are_reported() {
  let writer = SharedWriter::default();
  let subscriber = tracing_subscriber::fmt()
    .with_max_level(tracing::Level::DEBUG)
    .with_ansi(false)
    .with_writer(writer.clone())
    .finish();
  let _guard = tracing::subscriber::set_default(subscriber);

  let mut registry = BuildRegistry::new();
  registry
    .synthesize(
      "/a.d.ts",
      "export declare const x: Missing;\n",
      SynthesizeOptions::default(),
    )
    .unwrap();
  let code = registry
    .reassemble(
      "a.d.ts",
      "var x = [0, () => [void 0]];\nexport { x };\n",
      &["/a.d.ts".to_string()],
      ReassembleOptions::default(),
    )
    .unwrap();
  assert_eq!(code, "declare const x: Missing;\nexport { x };\n");

  let output = writer.contents();
  assert!(
    output.contains("host did not keep a declaration dependency"),
    "expected a dropped dependency warning, got: {output}"
  );
  assert!(output.contains("dependency=Missing"), "got: {output}");
}
