use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::collections::BTreeMap;
use std::sync::Arc;
use vastlog::logs::{
    chunk_content, JsonConverter, LogContent, LogFormat, LogInfo, LogLevel, Logger, NoopLogger,
    SerdeJsonConverter, TableFormat,
};
use vastlog::plugins::{LogFilter, LogJson, LogPrinter, LogSwitch};
use vastlog::{get_log_factory, LogCall};

/// Benchmark pipeline construction from installed plugins
fn bench_build_pipeline(c: &mut Criterion) {
    let factory = get_log_factory(|f| {
        f.install_default(LogSwitch);
        f.install_default(LogFilter);
    });

    c.bench_function("build_pipeline", |b| {
        b.iter(|| {
            black_box(factory.build_pipeline().ok());
        });
    });
}

/// Benchmark executing a record through every log phase
fn bench_execute(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("Failed to build runtime");

    let factory = get_log_factory(|f| {
        let converter: Arc<dyn JsonConverter> = Arc::new(SerdeJsonConverter::compact());
        let logger: Arc<dyn Logger> = Arc::new(NoopLogger);
        f.install_default(LogSwitch);
        f.install(LogJson, move |c| c.converter = Some(converter.clone()));
        f.install(LogFilter, |c| c.exclude_tags.push("^ignored".to_string()));
        f.install(LogPrinter, move |c| c.logger = Some(logger.clone()));
    });
    let pipeline = factory.build_pipeline().expect("Failed to build pipeline");
    let call = Arc::new(LogCall::new("bench"));

    c.bench_function("execute_text_record", |b| {
        b.iter(|| {
            let record = LogInfo::new(LogLevel::Info, "bench", "plain message");
            black_box(runtime.block_on(pipeline.execute(call.clone(), record)).ok());
        });
    });

    let mut map = BTreeMap::new();
    map.insert("user", "alice");
    map.insert("action", "login");
    c.bench_function("execute_object_record", |b| {
        b.iter(|| {
            let record = LogInfo::new(LogLevel::Info, "bench", LogContent::object(&map));
            black_box(runtime.block_on(pipeline.execute(call.clone(), record)).ok());
        });
    });
}

/// Benchmark formatting and chunking of long content
fn bench_format(c: &mut Criterion) {
    let content = "x".repeat(5000);
    let record = LogInfo::new(LogLevel::Warn, "bench", content.as_str());
    let format = TableFormat::default();

    c.bench_function("chunk_content", |b| {
        b.iter(|| {
            black_box(chunk_content(black_box(&content), 1000, usize::MAX));
        });
    });

    c.bench_function("table_format", |b| {
        b.iter(|| {
            black_box(format.format_lines(&record));
        });
    });
}

criterion_group!(benches, bench_build_pipeline, bench_execute, bench_format);
criterion_main!(benches);
