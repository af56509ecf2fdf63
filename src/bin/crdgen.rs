//! # CRD Generator
//!
//! Generates the CustomResourceDefinition YAML for every kind the controller
//! serves.
//!
//! ## Usage
//!
//! ```bash
//! # Generate CRD YAML
//! cargo run --bin crdgen > config/crd/aws-provider.yaml
//!
//! # Generate and apply directly
//! cargo run --bin crdgen | kubectl apply -f -
//! ```

use aws_provider_controller::crd::all_crds;

fn main() {
    let mut documents = Vec::new();
    for crd in all_crds() {
        match serde_yaml::to_string(&crd) {
            Ok(yaml) => documents.push(yaml),
            Err(e) => {
                eprintln!("Failed to serialize CRD to YAML: {e}");
                std::process::exit(1);
            }
        }
    }
    print!("{}", documents.join("---\n"));
}
