//! Files written by `nakalator init`

/// Credentials file with placeholder keys
pub const CREDENTIALS: &str = r#"# Nakala API keys, one per instance.
API_NAKALA_KEY_PROD: "" # key for https://api.nakala.fr
API_NAKALA_KEY_TEST: "" # key for https://apitest.nakala.fr
"#;

/// Name of the example job file
pub const METADATA_EXAMPLE_FILE: &str = "metadata_example.yml";

/// Example job file; copy it to describe a new data resource
pub const METADATA_EXAMPLE: &str = r#"# Example job file. Keep it as a model: copy it for every data resource to send.

name: "BELLELAY" # project name, also the report directory under output/

# ---------------------------------------------------------------------------
# Data
# ---------------------------------------------------------------------------
data:
  path: "data/my_project/" # directory of the files to send, under the workspace data/ directory
  type: "tif"              # file format hint (tif, jpeg, png, pdf...)
  status: "pending"        # "pending" or "published"; publish on Nakala once the deposit is checked

# ---------------------------------------------------------------------------
# Collection
# ---------------------------------------------------------------------------
collectionIds: ""          # DOI of an existing collection, or empty to create one
collectionTitle: "Graduel de Bellelay"       # required to create a collection
collectionDescription: "Digitised pages of the Bellelay gradual" # required to create a collection
collectionStatus: "private" # "private" or "public"; empty means private

# ---------------------------------------------------------------------------
# Metadata: property URI -> value, lang, typeUri
# Missing creator, created, license, type and publisher get default values.
# ---------------------------------------------------------------------------
metadata:
  http://nakala.fr/terms#title:
    value: "Images du graduel de Bellelay"
    lang: "fr"
    typeUri: "http://www.w3.org/2001/XMLSchema#string"

  http://purl.org/dc/terms/description:
    value: "Graduel des Prémontrés de Bellelay"
    lang: "fr"
    typeUri: "http://www.w3.org/2001/XMLSchema#string"

  http://nakala.fr/terms#creator:
    value:
      givenname: "Jane"
      surname: "Doe"

  http://nakala.fr/terms#license:
    value: "CC-BY-4.0"
    typeUri: "http://www.w3.org/2001/XMLSchema#string"

  http://nakala.fr/terms#type:
    value: "http://purl.org/coar/resource_type/c_c513"
    typeUri: "http://www.w3.org/2001/XMLSchema#anyURI"

  # Other Dublin Core terms can be added the same way:
  # http://purl.org/dc/terms/contributor, /language, /spatial, /subject ...
"#;
