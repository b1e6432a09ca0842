/*!
# Gateway DevKit - Stubs et utilitaires de test

Bibliothèque facilitant les tests du gateway sans Prometheus réel:
- Serveur Prometheus factice (`/api/v1/query`) piloté par règles
- Builders des corps JSON de l'API Prometheus
*/

pub mod prometheus_stub;
pub mod responses;

pub use prometheus_stub::{ReceivedQuery, StubAnswer, StubPrometheus};
pub use responses::PromResponse;
