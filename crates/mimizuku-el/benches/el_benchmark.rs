use criterion::{black_box, criterion_group, criterion_main, Criterion};
use mimizuku_el::{Axiom, ConceptExpr, DlSyntaxLoader, OntologyLoader, Reasoner, TBox};

/// Chain `Class{i} ⊑ Class{i-1} ⊓ ∃hasPart.Part{i}` with a shared role filler cycle
fn create_chain_tbox(size: usize) -> TBox {
    let mut tbox = TBox::new();
    for i in 1..size {
        tbox.add_axiom(Axiom::inclusion(
            ConceptExpr::name(format!("Class{}", i)),
            ConceptExpr::and(
                ConceptExpr::name(format!("Class{}", i - 1)),
                ConceptExpr::exists("hasPart", ConceptExpr::name(format!("Part{}", i))),
            ),
        ));
        tbox.add_axiom(Axiom::inclusion(
            ConceptExpr::name(format!("Part{}", i)),
            ConceptExpr::exists("partOf", ConceptExpr::name(format!("Class{}", i - 1))),
        ));
    }
    tbox
}

fn benchmark_subsumers(c: &mut Criterion) {
    let sizes = vec![10, 50, 100];

    for size in sizes {
        let reasoner = Reasoner::new(create_chain_tbox(size));
        let query = format!("Class{}", size - 1);
        c.bench_function(&format!("el_subsumers_{}_classes", size), |b| {
            b.iter(|| {
                let _subsumers = reasoner.subsumers_of(black_box(&query)).unwrap();
            });
        });
    }
}

fn benchmark_classify(c: &mut Criterion) {
    let sizes = vec![10, 25];

    for size in sizes {
        let reasoner = Reasoner::new(create_chain_tbox(size));
        c.bench_function(&format!("el_classify_{}_classes", size), |b| {
            b.iter(|| {
                let _hierarchy = reasoner.classify().unwrap();
            });
        });
    }
}

fn benchmark_dl_syntax_loading(c: &mut Criterion) {
    let sizes = vec![100, 1000];

    for size in sizes {
        let source: String = create_chain_tbox(size)
            .iter()
            .map(|axiom| format!("{}\n", axiom))
            .collect();
        let loader = DlSyntaxLoader::new();

        c.bench_function(&format!("el_dl_loading_{}_classes", size), |b| {
            b.iter(|| {
                let _tbox = loader.load_tbox(black_box(&source)).unwrap();
            });
        });
    }
}

criterion_group!(benches, benchmark_subsumers, benchmark_classify, benchmark_dl_syntax_loading);
criterion_main!(benches);
