use tracing::debug;

use crate::models::{Doctor, DoctorError, DoctorSearchQuery};

/// Read-only doctor list. Nothing in the service mutates it after startup.
#[derive(Debug, Clone)]
pub struct DoctorDirectory {
    doctors: Vec<Doctor>,
}

impl DoctorDirectory {
    pub fn new(doctors: Vec<Doctor>) -> Self {
        Self { doctors }
    }

    /// The clinic's built-in roster.
    pub fn seeded() -> Self {
        Self::new(vec![
            seed_doctor(
                "DOC001",
                "Dr. John Smith",
                "Cardiologist",
                "15 years",
                4.8,
                "dr.smith@hospital.com",
                "9876543220",
                "Mumbai, India",
                "https://images.unsplash.com/photo-1612349317150-e413f6a5b16d?w=400",
                "MMC-2010-44871",
            ),
            seed_doctor(
                "DOC002",
                "Dr. Sarah Johnson",
                "Neurologist",
                "12 years",
                4.9,
                "dr.sarah@hospital.com",
                "9876543221",
                "Delhi, India",
                "https://images.unsplash.com/photo-1559839734-2b71ea197ec2?w=400",
                "DMC-2013-20417",
            ),
            seed_doctor(
                "DOC003",
                "Dr. Mike Wilson",
                "Orthopedic",
                "10 years",
                4.7,
                "dr.mike@hospital.com",
                "9876543222",
                "Bangalore, India",
                "https://images.unsplash.com/photo-1622253692010-333f2da6031d?w=400",
                "KMC-2015-77310",
            ),
            seed_doctor(
                "DOC004",
                "Dr. Priya Patel",
                "Dermatologist",
                "8 years",
                4.6,
                "dr.priya@hospital.com",
                "9876543223",
                "Ahmedabad, India",
                "https://images.unsplash.com/photo-1594824476967-48c8b964273f?w=400",
                "GMC-2017-10952",
            ),
        ])
    }

    pub fn all(&self) -> &[Doctor] {
        &self.doctors
    }

    pub fn find(&self, doctor_id: &str) -> Option<&Doctor> {
        self.doctors.iter().find(|d| d.id == doctor_id)
    }

    pub fn get(&self, doctor_id: &str) -> Result<&Doctor, DoctorError> {
        self.find(doctor_id)
            .ok_or_else(|| DoctorError::NotFound(doctor_id.to_string()))
    }

    pub fn contains(&self, doctor_id: &str) -> bool {
        self.find(doctor_id).is_some()
    }

    pub fn search(&self, query: &DoctorSearchQuery) -> Vec<Doctor> {
        let specialization = non_blank(query.specialization.as_deref());
        let term = non_blank(query.q.as_deref());

        debug!("Searching doctors: specialization={:?} q={:?}", specialization, term);

        self.doctors
            .iter()
            .filter(|doctor| match &specialization {
                Some(wanted) => doctor.specialization.to_lowercase() == *wanted,
                None => true,
            })
            .filter(|doctor| match &term {
                Some(term) => {
                    doctor.name.to_lowercase().contains(term.as_str())
                        || doctor.specialization.to_lowercase().contains(term.as_str())
                        || doctor.location.to_lowercase().contains(term.as_str())
                }
                None => true,
            })
            .cloned()
            .collect()
    }
}

impl Default for DoctorDirectory {
    fn default() -> Self {
        Self::seeded()
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_lowercase)
}

#[allow(clippy::too_many_arguments)]
fn seed_doctor(
    id: &str,
    name: &str,
    specialization: &str,
    experience: &str,
    rating: f32,
    email: &str,
    phone: &str,
    location: &str,
    profile_image: &str,
    registration_no: &str,
) -> Doctor {
    Doctor {
        id: id.to_string(),
        name: name.to_string(),
        specialization: specialization.to_string(),
        experience: experience.to_string(),
        rating,
        email: email.to_string(),
        phone: phone.to_string(),
        location: location.to_string(),
        profile_image: profile_image.to_string(),
        availability: "Mon - Sat".to_string(),
        working_hours: "09:00 AM - 06:00 PM".to_string(),
        description: None,
        registration_no: Some(registration_no.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_roster() {
        let directory = DoctorDirectory::seeded();
        assert_eq!(directory.all().len(), 4);
        assert!(directory.contains("DOC003"));
        assert!(!directory.contains("doc003"));
        assert_eq!(directory.get("DOC002").unwrap().specialization, "Neurologist");
        assert_eq!(directory.get("DOC999"), Err(DoctorError::NotFound("DOC999".to_string())));
    }

    #[test]
    fn test_search_by_specialization_is_case_insensitive() {
        let directory = DoctorDirectory::seeded();
        let query = DoctorSearchQuery {
            specialization: Some("cardiologist".to_string()),
            q: None,
        };

        let found = directory.search(&query);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "DOC001");
    }

    #[test]
    fn test_free_text_matches_location() {
        let directory = DoctorDirectory::seeded();
        let query = DoctorSearchQuery {
            specialization: None,
            q: Some(" bangalore ".to_string()),
        };

        let found = directory.search(&query);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Dr. Mike Wilson");
    }

    #[test]
    fn test_blank_query_returns_everyone() {
        let directory = DoctorDirectory::seeded();
        let query = DoctorSearchQuery {
            specialization: Some("  ".to_string()),
            q: Some(String::new()),
        };
        assert_eq!(directory.search(&query).len(), 4);
    }
}
