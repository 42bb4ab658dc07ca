//! Static arXiv subject taxonomy.
//!
//! Read-only lookup tables mapping topic labels to listing codes and topics to
//! the subject tags that appear on their listing pages. Nothing here mutates.

use tracing::{info, warn};

/// Top-level arXiv topics and their listing codes.
///
/// "Physics" has no single code; its sub-topics live in [`PHYSICS_TOPICS`].
pub const TOPICS: &[(&str, &str)] = &[
    ("Physics", ""),
    ("Mathematics", "math"),
    ("Computer Science", "cs"),
    ("Quantitative Biology", "q-bio"),
    ("Quantitative Finance", "q-fin"),
    ("Statistics", "stat"),
    ("Electrical Engineering and Systems Science", "eess"),
    ("Economics", "econ"),
];

/// Physics sub-topics and their listing codes.
pub const PHYSICS_TOPICS: &[(&str, &str)] = &[
    ("Astrophysics", "astro-ph"),
    ("Condensed Matter", "cond-mat"),
    ("General Relativity and Quantum Cosmology", "gr-qc"),
    ("High Energy Physics - Experiment", "hep-ex"),
    ("High Energy Physics - Lattice", "hep-lat"),
    ("High Energy Physics - Phenomenology", "hep-ph"),
    ("High Energy Physics - Theory", "hep-th"),
    ("Mathematical Physics", "math-ph"),
    ("Nonlinear Sciences", "nlin"),
    ("Nuclear Experiment", "nucl-ex"),
    ("Nuclear Theory", "nucl-th"),
    ("Physics", "physics"),
    ("Quantum Physics", "quant-ph"),
];

/// Subject tags per topic. Topics without sub-categories carry an empty slice.
pub const SUBJECTS: &[(&str, &[&str])] = &[
    (
        "Astrophysics",
        &[
            "Astrophysics of Galaxies",
            "Cosmology and Nongalactic Astrophysics",
            "Earth and Planetary Astrophysics",
            "High Energy Astrophysical Phenomena",
            "Instrumentation and Methods for Astrophysics",
            "Solar and Stellar Astrophysics",
        ],
    ),
    (
        "Condensed Matter",
        &[
            "Disordered Systems and Neural Networks",
            "Materials Science",
            "Mesoscale and Nanoscale Physics",
            "Other Condensed Matter",
            "Quantum Gases",
            "Soft Condensed Matter",
            "Statistical Mechanics",
            "Strongly Correlated Electrons",
            "Superconductivity",
        ],
    ),
    ("General Relativity and Quantum Cosmology", &[]),
    ("High Energy Physics - Experiment", &[]),
    ("High Energy Physics - Lattice", &[]),
    ("High Energy Physics - Phenomenology", &[]),
    ("High Energy Physics - Theory", &[]),
    ("Mathematical Physics", &[]),
    (
        "Nonlinear Sciences",
        &[
            "Adaptation and Self-Organizing Systems",
            "Cellular Automata and Lattice Gases",
            "Chaotic Dynamics",
            "Exactly Solvable and Integrable Systems",
            "Pattern Formation and Solitons",
        ],
    ),
    ("Nuclear Experiment", &[]),
    ("Nuclear Theory", &[]),
    (
        "Physics",
        &[
            "Accelerator Physics",
            "Applied Physics",
            "Atmospheric and Oceanic Physics",
            "Atomic and Molecular Clusters",
            "Atomic Physics",
            "Biological Physics",
            "Chemical Physics",
            "Classical Physics",
            "Computational Physics",
            "Data Analysis, Statistics and Probability",
            "Fluid Dynamics",
            "General Physics",
            "Geophysics",
            "History and Philosophy of Physics",
            "Instrumentation and Detectors",
            "Medical Physics",
            "Optics",
            "Physics and Society",
            "Physics Education",
            "Plasma Physics",
            "Popular Physics",
            "Space Physics",
        ],
    ),
    ("Quantum Physics", &[]),
    (
        "Mathematics",
        &[
            "Algebraic Geometry",
            "Algebraic Topology",
            "Analysis of PDEs",
            "Category Theory",
            "Classical Analysis and ODEs",
            "Combinatorics",
            "Commutative Algebra",
            "Complex Variables",
            "Differential Geometry",
            "Dynamical Systems",
            "Functional Analysis",
            "General Mathematics",
            "General Topology",
            "Geometric Topology",
            "Group Theory",
            "History and Overview",
            "Information Theory",
            "K-Theory and Homology",
            "Logic",
            "Mathematical Physics",
            "Metric Geometry",
            "Number Theory",
            "Numerical Analysis",
            "Operator Algebras",
            "Optimization and Control",
            "Probability",
            "Quantum Algebra",
            "Representation Theory",
            "Rings and Algebras",
            "Spectral Theory",
            "Statistics Theory",
            "Symplectic Geometry",
        ],
    ),
    (
        "Computer Science",
        &[
            "Artificial Intelligence",
            "Computation and Language",
            "Computational Complexity",
            "Computational Engineering, Finance, and Science",
            "Computational Geometry",
            "Computer Science and Game Theory",
            "Computer Vision and Pattern Recognition",
            "Computers and Society",
            "Cryptography and Security",
            "Data Structures and Algorithms",
            "Databases",
            "Digital Libraries",
            "Discrete Mathematics",
            "Distributed, Parallel, and Cluster Computing",
            "Emerging Technologies",
            "Formal Languages and Automata Theory",
            "General Literature",
            "Graphics",
            "Hardware Architecture",
            "Human-Computer Interaction",
            "Information Retrieval",
            "Information Theory",
            "Logic in Computer Science",
            "Machine Learning",
            "Mathematical Software",
            "Multiagent Systems",
            "Multimedia",
            "Networking and Internet Architecture",
            "Neural and Evolutionary Computing",
            "Numerical Analysis",
            "Operating Systems",
            "Other Computer Science",
            "Performance",
            "Programming Languages",
            "Robotics",
            "Social and Information Networks",
            "Software Engineering",
            "Sound",
            "Symbolic Computation",
            "Systems and Control",
        ],
    ),
    (
        "Quantitative Biology",
        &[
            "Biomolecules",
            "Cell Behavior",
            "Genomics",
            "Molecular Networks",
            "Neurons and Cognition",
            "Other Quantitative Biology",
            "Populations and Evolution",
            "Quantitative Methods",
            "Subcellular Processes",
            "Tissues and Organs",
        ],
    ),
    (
        "Quantitative Finance",
        &[
            "Computational Finance",
            "Economics",
            "General Finance",
            "Mathematical Finance",
            "Portfolio Management",
            "Pricing of Securities",
            "Risk Management",
            "Statistical Finance",
            "Trading and Market Microstructure",
        ],
    ),
    (
        "Statistics",
        &[
            "Applications",
            "Computation",
            "Machine Learning",
            "Methodology",
            "Other Statistics",
            "Statistics Theory",
        ],
    ),
    (
        "Electrical Engineering and Systems Science",
        &[
            "Audio and Speech Processing",
            "Image and Video Processing",
            "Signal Processing",
            "Systems and Control",
        ],
    ),
    (
        "Economics",
        &["Econometrics", "General Economics", "Theoretical Economics"],
    ),
];

/// Resolve a topic label to its listing code.
///
/// Top-level topics are checked first; a top-level entry with an empty code
/// ("Physics") falls through to the physics sub-topics.
pub fn topic_code(topic: &str) -> Option<&'static str> {
    let lookup = |table: &'static [(&'static str, &'static str)]| {
        table
            .iter()
            .find(|(label, _)| *label == topic)
            .map(|(_, code)| *code)
            .filter(|code| !code.is_empty())
    };

    lookup(TOPICS).or_else(|| lookup(PHYSICS_TOPICS))
}

/// Every known subject tag, in table order. Duplicates across topics are kept.
pub fn all_subjects() -> impl Iterator<Item = &'static str> {
    SUBJECTS.iter().flat_map(|(_, subjects)| subjects.iter().copied())
}

/// Resolve a comma-separated subject string into canonical subject tags.
///
/// Each fragment is trimmed and lower-cased, then mapped to the first known
/// subject that contains it. Unknown fragments are dropped; the result keeps
/// first-seen order without duplicates.
pub fn resolve_subjects(input: &str) -> Vec<String> {
    let mut resolved: Vec<String> = Vec::new();

    for fragment in input.split(',') {
        let needle = fragment.trim().to_lowercase();
        if needle.is_empty() {
            continue;
        }

        match all_subjects().find(|s| s.to_lowercase().contains(&needle)) {
            Some(subject) => {
                if !resolved.iter().any(|r| r == subject) {
                    resolved.push(subject.to_string());
                }
            }
            None => warn!(subject = %fragment.trim(), "Unknown subject, ignoring"),
        }
    }

    info!(subjects = ?resolved, "Resolved subjects");
    resolved
}
