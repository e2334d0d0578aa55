//! Benchmarks for utterance classification latency.
//!
//! Classification runs on every conversational turn before any collaborator
//! is contacted, so it has to stay well below a millisecond per utterance.

use std::time::Duration;

use criterion::{criterion_group, criterion_main, Criterion};
use imre_intent::IntentClassifier;

const UTTERANCES: &[&str] = &[
    "Qual o status atual da plataforma?",
    "Preciso consultar a biblioteca sobre cannabis medicinal para dor crônica.",
    "Atualize as simulações de pacientes nefro em andamento.",
    "Paciente em dor crônica precisa de análise IMRE triaxial.",
    "Bom dia, tudo bem?",
    "Quero acessar o módulo do curso de formação",
    "O céu está azul hoje",
];

/// Build a long utterance (~120 words) without category keywords.
fn generate_long_utterance(index: usize) -> String {
    format!(
        "Relato do paciente número {}: sente desconforto há algumas semanas, \
         principalmente no período da manhã, com piora ao subir escadas e \
         alguma melhora após repouso prolongado. Refere noites mal dormidas, \
         cansaço ao longo do dia e perda de apetite moderada. Não houve \
         episódios de febre, mas relata sensação de peso nas pernas e \
         dificuldade para manter a rotina de trabalho. A família acompanha \
         de perto e pede orientações sobre os próximos passos, incluindo \
         ajustes de hábitos e possíveis encaminhamentos. O paciente descreve \
         ainda episódios de ansiedade leve e preocupação constante com a \
         evolução do quadro nos próximos meses.",
        index
    )
}

fn bench_classify(c: &mut Criterion) {
    let classifier = IntentClassifier::new();
    let long: Vec<String> = (0..100).map(generate_long_utterance).collect();

    let mut group = c.benchmark_group("intent_classification");
    group.sample_size(200);
    group.measurement_time(Duration::from_secs(5));

    group.bench_function("short_utterance", |b| {
        let mut idx = 0usize;
        b.iter(|| {
            let intent = classifier.classify(UTTERANCES[idx % UTTERANCES.len()]);
            idx += 1;
            intent
        });
    });

    group.bench_function("long_utterance", |b| {
        let mut idx = 0usize;
        b.iter(|| {
            let intent = classifier.classify(&long[idx % long.len()]);
            idx += 1;
            intent
        });
    });

    group.finish();
}

/// p95 latency check over the long utterances.
fn bench_classify_latency_assertion(c: &mut Criterion) {
    let classifier = IntentClassifier::new();
    let samples: Vec<String> = (0..1000).map(generate_long_utterance).collect();
    let target = Duration::from_micros(1000);

    let mut group = c.benchmark_group("intent_latency_assertion");
    group.sample_size(100);
    group.bench_function("long_utterance_single", |b| {
        b.iter(|| classifier.classify(&samples[0]));
    });
    group.finish();

    let mut times = Vec::with_capacity(samples.len());
    for text in &samples {
        let start = std::time::Instant::now();
        let _intent = classifier.classify(text);
        times.push(start.elapsed());
    }
    times.sort();
    let p95 = times[949];
    let median = times[499];

    eprintln!("\n=== Intent Classification Latency (1000 long utterances) ===");
    eprintln!("Median:  {:?}", median);
    eprintln!("p95:     {:?} (target: {:?})", p95, target);

    assert!(
        p95 < target,
        "Classification p95 {:?} exceeds target {:?}",
        p95,
        target
    );
}

criterion_group!(benches, bench_classify, bench_classify_latency_assertion);
criterion_main!(benches);
