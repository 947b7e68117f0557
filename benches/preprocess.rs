use criterion::{criterion_group, criterion_main, Criterion};

use sitepp::preprocess::Preprocessor;

fn bench_preprocess_short(c: &mut Criterion) {
    c.bench_function("preprocess", |b| {
        b.iter(|| {
            let input = "\
#define GREET(who)(<p>hello, {who}</p>)
#define BOX(title,content)(<div class=\"box\"><h2>{title}</h2>{content}</div>)
#define YEAR()(2026)
#ifdef DEBUG
<!-- debug build YEAR() -->
#endif
<html>
<head><title>Example</title></head>
<body>
GREET(world)
BOX(
  Welcome,
  <p>This is the body.</p>
)
</body>
</html>";

            let mut pp = Preprocessor::new();
            pp.process(input, None).unwrap();
        })
    });
}

criterion_group!(benches, bench_preprocess_short);
criterion_main!(benches);
